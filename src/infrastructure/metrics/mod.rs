//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Registered WebSocket sessions gauge
//! - Inbound WebSocket events by kind
//! - Delivery cascade outcomes by stage
//! - Fan-out push outcomes
//! - Conversation cache hits and misses
//! - Database query duration histograms

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "chat_relay";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Sessions currently held by the registry
pub static SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("sessions_active", "Number of registered WebSocket sessions").namespace(NAMESPACE),
    )
    .expect("Failed to create SESSIONS_ACTIVE metric")
});

/// Inbound WebSocket events by kind
pub static INBOUND_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("inbound_events_total", "Inbound WebSocket events by kind").namespace(NAMESPACE),
        &["kind"],
    )
    .expect("Failed to create INBOUND_EVENTS_TOTAL metric")
});

/// Delivery cascade outcomes
pub static CASCADE_OUTCOMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cascade_outcomes_total", "Delivery cascade outcomes by stage").namespace(NAMESPACE),
        &["stage", "outcome"], // stage: "primary", "retry", "dead"
    )
    .expect("Failed to create CASCADE_OUTCOMES_TOTAL metric")
});

/// Fan-out push outcomes
pub static FANOUT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fanout_total", "Fan-out push attempts by outcome").namespace(NAMESPACE),
        &["outcome"], // "delivered", "offline", "dropped"
    )
    .expect("Failed to create FANOUT_TOTAL metric")
});

/// Conversation cache lookups
pub static CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cache_lookups_total", "Conversation cache lookups").namespace(NAMESPACE),
        &["result"], // "hit", "miss"
    )
    .expect("Failed to create CACHE_LOOKUPS_TOTAL metric")
});

/// Database query duration histogram
pub static DB_QUERY_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];
    HistogramVec::new(
        HistogramOpts::new(
            "db_query_duration_seconds",
            "Database query latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["operation", "table"],
    )
    .expect("Failed to create DB_QUERY_DURATION_SECONDS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(SESSIONS_ACTIVE.clone()))
        .expect("Failed to register SESSIONS_ACTIVE");
    registry
        .register(Box::new(INBOUND_EVENTS_TOTAL.clone()))
        .expect("Failed to register INBOUND_EVENTS_TOTAL");
    registry
        .register(Box::new(CASCADE_OUTCOMES_TOTAL.clone()))
        .expect("Failed to register CASCADE_OUTCOMES_TOTAL");
    registry
        .register(Box::new(FANOUT_TOTAL.clone()))
        .expect("Failed to register FANOUT_TOTAL");
    registry
        .register(Box::new(CACHE_LOOKUPS_TOTAL.clone()))
        .expect("Failed to register CACHE_LOOKUPS_TOTAL");
    registry
        .register(Box::new(DB_QUERY_DURATION_SECONDS.clone()))
        .expect("Failed to register DB_QUERY_DURATION_SECONDS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Helper to record database query metrics
pub fn record_db_query(operation: &str, table: &str, duration_secs: f64) {
    DB_QUERY_DURATION_SECONDS
        .with_label_values(&[operation, table])
        .observe(duration_secs);
}

pub fn set_active_sessions(count: usize) {
    SESSIONS_ACTIVE.set(count as i64);
}

pub fn record_inbound_event(kind: &str) {
    INBOUND_EVENTS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_cascade_outcome(stage: &str, outcome: &str) {
    CASCADE_OUTCOMES_TOTAL.with_label_values(&[stage, outcome]).inc();
}

pub fn record_fanout(outcome: &str) {
    FANOUT_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    CACHE_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
}
