//! Prometheus metrics
//!
//! Counters cover the cache layers (hit/miss per keyspace), upstream fetch
//! failures per source, and the HTTP boundary. Text exposition is served by
//! the boundary at `/metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter_vec, Encoder, IntCounterVec, TextEncoder,
};
use tracing::error;

// Cache hit/miss per keyspace
static CACHE_OPS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "newsgate_cache_ops_total",
        "Cache lookups by keyspace and outcome",
        &["keyspace", "outcome"]
    )
    .expect("Failed to create cache_ops metric")
});

// Upstream fetch failures
static FETCH_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "newsgate_fetch_errors_total",
        "Upstream fetch or extraction failures by source",
        &["source"]
    )
    .expect("Failed to create fetch_errors metric")
});

// HTTP boundary requests
static HTTP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "newsgate_http_requests_total",
        "Requests served by route and status",
        &["route", "status"]
    )
    .expect("Failed to create http_requests metric")
});

/// Records a cache hit for a keyspace
pub fn record_cache_hit(keyspace: &str) {
    CACHE_OPS.with_label_values(&[keyspace, "hit"]).inc();
}

/// Records a cache miss for a keyspace
pub fn record_cache_miss(keyspace: &str) {
    CACHE_OPS.with_label_values(&[keyspace, "miss"]).inc();
}

/// Records an upstream fetch or extraction failure
pub fn record_fetch_error(source: &str) {
    FETCH_ERRORS.with_label_values(&[source]).inc();
}

/// Records a served HTTP request
pub fn record_http_request(route: &str, status: u16) {
    HTTP_REQUESTS
        .with_label_values(&[route, &status.to_string()])
        .inc();
}

/// Collects all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_metrics() {
        record_cache_hit("daily");
        record_cache_miss("daily");
        record_fetch_error("topics");
        record_http_request("/resources", 200);

        let metrics = gather_metrics();
        assert!(metrics.contains("newsgate_cache_ops_total"));
        assert!(metrics.contains("newsgate_fetch_errors_total"));
        assert!(metrics.contains("newsgate_http_requests_total"));
    }
}
