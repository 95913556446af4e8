//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Webhook event counts by event type and outcome
//! - Webhook processing latency histograms
//! - Retry attempt counters
//! - Purged session counters

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Webhook event counter - tracks processed events by type and outcome
pub static WEBHOOK_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("webhook_events_total", "Total number of processed webhook events")
            .namespace("identity_sync"),
        &["event_type", "status"],
    )
    .expect("Failed to create WEBHOOK_EVENTS_TOTAL metric")
});

/// Webhook processing latency histogram - tracks per-event duration in seconds
pub static WEBHOOK_EVENT_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];
    HistogramVec::new(
        HistogramOpts::new(
            "webhook_event_duration_seconds",
            "Webhook event processing latency in seconds",
        )
        .namespace("identity_sync")
        .buckets(buckets),
        &["event_type"],
    )
    .expect("Failed to create WEBHOOK_EVENT_DURATION_SECONDS metric")
});

/// Retry attempt counter by event type
pub static WEBHOOK_RETRIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("webhook_retries_total", "Total number of webhook retry attempts")
            .namespace("identity_sync"),
        &["event_type"],
    )
    .expect("Failed to create WEBHOOK_RETRIES_TOTAL metric")
});

/// Sessions removed by the retention sweep
pub static SESSIONS_PURGED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("sessions_purged_total", "Total number of sessions removed by retention")
            .namespace("identity_sync"),
    )
    .expect("Failed to create SESSIONS_PURGED_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WEBHOOK_EVENTS_TOTAL.clone()))
        .expect("Failed to register WEBHOOK_EVENTS_TOTAL");
    registry
        .register(Box::new(WEBHOOK_EVENT_DURATION_SECONDS.clone()))
        .expect("Failed to register WEBHOOK_EVENT_DURATION_SECONDS");
    registry
        .register(Box::new(WEBHOOK_RETRIES_TOTAL.clone()))
        .expect("Failed to register WEBHOOK_RETRIES_TOTAL");
    registry
        .register(Box::new(SESSIONS_PURGED_TOTAL.clone()))
        .expect("Failed to register SESSIONS_PURGED_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}

/// Helper to record the outcome and duration of one webhook event
pub fn record_webhook_event(event_type: &str, status: &str, duration: std::time::Duration) {
    WEBHOOK_EVENTS_TOTAL
        .with_label_values(&[event_type, status])
        .inc();
    WEBHOOK_EVENT_DURATION_SECONDS
        .with_label_values(&[event_type])
        .observe(duration.as_secs_f64());
}

/// Helper to record a retry attempt
pub fn record_webhook_retry(event_type: &str) {
    WEBHOOK_RETRIES_TOTAL.with_label_values(&[event_type]).inc();
}

/// Helper to record sessions removed by the retention sweep
pub fn record_sessions_purged(count: u64) {
    SESSIONS_PURGED_TOTAL.inc_by(count);
}
