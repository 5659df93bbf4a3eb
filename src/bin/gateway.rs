use std::process::ExitCode;
use streamgate::config::GatewayConfig;
use streamgate::gateway::{build_router, state::GatewayState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("starting {}", config.app_name);

    let metrics_handle = streamgate::metrics::install_recorder();
    let state = GatewayState::new(config.clone()).with_metrics_handle(metrics_handle);
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind to {addr}: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("streaming gateway listening on http://{addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("streaming gateway shut down");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
