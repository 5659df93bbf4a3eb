//! Shared state for the CDN edge's handlers.
//!
//! A single `EdgeState` is constructed once in `main` (or by a test
//! fixture) and cloned per request. The `reqwest::Client` is one long-lived
//! instance shared across every request — never built per-request, so
//! connection pooling and keep-alive actually pay off.

use crate::cache::EdgeCache;
use crate::config::EdgeConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct EdgeState {
    pub config: Arc<EdgeConfig>,
    pub cache: Arc<EdgeCache>,
    pub http_client: Client,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl EdgeState {
    pub fn new(config: EdgeConfig) -> Self {
        let http_client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build the edge's shared HTTP client");

        let cache = Arc::new(EdgeCache::new(config.cache_max_size));

        Self {
            config: Arc::new(config),
            cache,
            http_client,
            metrics_handle: None,
        }
    }

    pub fn with_metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
