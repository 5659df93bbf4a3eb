use std::process::ExitCode;
use streamgate::config::EdgeConfig;
use streamgate::edge::{build_router, spawn_stats_logger, state::EdgeState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let config = match EdgeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("starting {}", config.app_name);

    let metrics_handle = streamgate::metrics::install_recorder();
    let port = config.port;
    let state = EdgeState::new(config).with_metrics_handle(metrics_handle);
    let stats_task = spawn_stats_logger(state.clone());
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind to {addr}: {e}");
            stats_task.abort();
            return ExitCode::FAILURE;
        }
    };

    info!("CDN edge listening on http://{addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server error: {e}");
        stats_task.abort();
        return ExitCode::FAILURE;
    }

    stats_task.abort();
    info!("CDN edge shut down");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
