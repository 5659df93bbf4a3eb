//! Thin wrappers around the `metrics` crate's global recorder.
//!
//! Per-route request counters labeled by route and status, plus a duration
//! histogram, exported via `metrics-exporter-prometheus` at `/metrics` on
//! both binaries.

use metrics::{counter, histogram};
use std::time::Instant;

/// Record one completed request for `route`, tagged with its final status.
pub fn record_request(route: &'static str, status: u16) {
    counter!("streamgate_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
}

/// Record how long a request to `route` took, measured from `start`.
pub fn record_duration(route: &'static str, start: Instant) {
    histogram!("streamgate_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

/// Record an edge cache hit or miss.
pub fn record_cache_outcome(hit: bool) {
    let label = if hit { "hit" } else { "miss" };
    counter!("streamgate_edge_cache_total", "outcome" => label).increment(1);
}

/// Record a failed attempt to reach the origin from the edge.
pub fn record_origin_error() {
    counter!("streamgate_origin_errors_total").increment(1);
}

/// Install the Prometheus recorder and return its render handle, mounted by
/// each binary's `main` at startup before building the router.
pub fn install_recorder() -> metrics_exporter_prometheus::PrometheusHandle {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus metrics recorder")
}
