//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming. Recording is a no-op until
//! a recorder (the Prometheus exporter) is installed.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all YaMDb metrics
pub const METRICS_PREFIX: &str = "yamdb";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_signups_total", METRICS_PREFIX),
        Unit::Count,
        "Confirmation codes issued through signup"
    );

    describe_counter!(
        format!("{}_tokens_issued_total", METRICS_PREFIX),
        Unit::Count,
        "Access tokens issued for confirmation codes"
    );

    describe_counter!(
        format!("{}_reviews_created_total", METRICS_PREFIX),
        Unit::Count,
        "Reviews created"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// A signup issued a confirmation code; `repeat` marks an existing pair
pub fn record_signup(repeat: bool) {
    counter!(
        format!("{}_signups_total", METRICS_PREFIX),
        "repeat" => repeat.to_string()
    )
    .increment(1);
}

pub fn record_token_issued() {
    counter!(format!("{}_tokens_issued_total", METRICS_PREFIX)).increment(1);
}

pub fn record_review_created(score: i32) {
    counter!(
        format!("{}_reviews_created_total", METRICS_PREFIX),
        "score" => score.to_string()
    )
    .increment(1);
}
