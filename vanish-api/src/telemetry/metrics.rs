//! Prometheus Metrics Definitions
//!
//! Defines the vanish metrics and exposes a /metrics endpoint for
//! Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec, Encoder,
    HistogramVec, TextEncoder,
};
use vanish_core::StoreTier;

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized on first use
pub static METRICS: Lazy<ApiResult<VanishMetrics>> = Lazy::new(VanishMetrics::new);

/// The registered metrics, or `None` if registration failed.
pub fn metrics() -> Option<&'static VanishMetrics> {
    METRICS.as_ref().ok()
}

/// Outcome label for delete attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Forbidden,
    NotFound,
    Error,
}

impl DeleteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteOutcome::Deleted => "deleted",
            DeleteOutcome::Forbidden => "forbidden",
            DeleteOutcome::NotFound => "not_found",
            DeleteOutcome::Error => "error",
        }
    }
}

/// Container for all vanish metrics.
#[derive(Clone)]
pub struct VanishMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Secrets successfully created
    pub secrets_created_total: Counter,

    /// Secrets consumed - labels: tier
    pub secret_reads_total: CounterVec,

    /// Delete attempts - labels: outcome
    pub secret_deletes_total: CounterVec,

    /// Storage failures - labels: tier
    pub store_errors_total: CounterVec,
}

impl VanishMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "vanish_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_failed("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "vanish_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_failed("http_request_duration_seconds", e))?,

            secrets_created_total: register_counter!(
                "vanish_secrets_created_total",
                "Total number of secrets created"
            )
            .map_err(|e| registration_failed("secrets_created_total", e))?,

            secret_reads_total: register_counter_vec!(
                "vanish_secret_reads_total",
                "Total number of secrets consumed, by serving tier",
                &["tier"]
            )
            .map_err(|e| registration_failed("secret_reads_total", e))?,

            secret_deletes_total: register_counter_vec!(
                "vanish_secret_deletes_total",
                "Total number of delete attempts, by outcome",
                &["outcome"]
            )
            .map_err(|e| registration_failed("secret_deletes_total", e))?,

            store_errors_total: register_counter_vec!(
                "vanish_store_errors_total",
                "Total number of storage tier failures",
                &["tier"]
            )
            .map_err(|e| registration_failed("store_errors_total", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_created(&self) {
        self.secrets_created_total.inc();
    }

    pub fn record_read(&self, tier: StoreTier) {
        self.secret_reads_total
            .with_label_values(&[tier.as_str()])
            .inc();
    }

    pub fn record_delete(&self, outcome: DeleteOutcome) {
        self.secret_deletes_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    pub fn record_store_error(&self, tier: StoreTier) {
        self.store_errors_total
            .with_label_values(&[tier.as_str()])
            .inc();
    }
}

fn registration_failed(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    // Make sure vanish metrics exist even before the first request records one
    let _ = metrics();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
