//! Streaming Gateway: origin HTTP surface.

pub mod handlers;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use state::GatewayState;
use tower_http::cors::CorsLayer;

/// Build the gateway's router from already-constructed state, so tests can
/// substitute an in-memory object store while exercising the real routing
/// and signature-verification logic via `tower::ServiceExt::oneshot`.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .route("/api/stream/{track_id}", get(handlers::stream::get_stream))
        .route("/api/stream/refresh", post(handlers::stream::refresh_stream))
        .route("/origin/{*resource_path}", get(handlers::origin::serve_resource))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
