//! `GET /health` and `GET /metrics` for the streaming gateway.

use crate::gateway::state::GatewayState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health_check(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": state.config.app_name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn metrics_endpoint(State(state): State<GatewayState>) -> impl IntoResponse {
    match &state.metrics_handle {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::OK, String::new()),
    }
}
