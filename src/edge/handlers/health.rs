//! `GET /health`, `GET /stats`, `GET /metrics` for the CDN edge.

use crate::edge::state::EdgeState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health_check(State(state): State<EdgeState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": state.config.app_name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn stats(State(state): State<EdgeState>) -> impl IntoResponse {
    let stats = state.cache.stats();
    Json(json!({
        "cache": {
            "hits": stats.hits,
            "misses": stats.misses,
            "total_requests": stats.total(),
            "hit_rate_percent": round2(stats.hit_rate()),
            "cached_items": stats.items,
            "total_bytes_cached": stats.bytes,
            "total_mb_cached": round2(stats.mb()),
        },
        "service": state.config.app_name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn metrics_endpoint(State(state): State<EdgeState>) -> impl IntoResponse {
    match &state.metrics_handle {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::OK, String::new()),
    }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
