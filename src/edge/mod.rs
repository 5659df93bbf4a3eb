//! CDN Edge: cache/proxy HTTP surface.

pub mod handlers;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use state::EdgeState;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;

pub fn build_router(state: EdgeState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/stats", get(handlers::health::stats))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .route("/cache/entries", get(handlers::cache_admin::list_entries))
        .route("/cache/entries/{cache_id}", get(handlers::cache_admin::get_entry))
        .route("/cache/summary", get(handlers::cache_admin::summary))
        .route("/api/stream/{track_id}", get(handlers::passthrough::stream_metadata))
        .route("/api/stream/refresh", post(handlers::passthrough::stream_refresh))
        .route("/origin/{*resource_path}", get(handlers::proxy::proxy_resource))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Periodically log cache statistics, every 300s. Returns the task handle
/// so `main` can cancel it on shutdown.
pub fn spawn_stats_logger(state: EdgeState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        interval.tick().await; // first tick fires immediately; skip it
        loop {
            interval.tick().await;
            if !state.config.log_cache_stats {
                continue;
            }
            let stats = state.cache.stats();
            info!(
                hits = stats.hits,
                misses = stats.misses,
                hit_rate_percent = handlers::health::round2(stats.hit_rate()),
                cached_items = stats.items,
                total_mb_cached = handlers::health::round2(stats.mb()),
                "cache stats"
            );
        }
    })
}
