//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Every request gets a tracing span and is recorded in the Prometheus
//! request counter and latency histogram.

use axum::{extract::Request, middleware::Next, response::Response};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::metrics;

// UUID pattern: 8-4-4-4-12 hex chars
static UUID_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}").ok()
});

/// Normalize path for metrics/spans.
///
/// Every segment after `/secret/` is a key, valid or not, and is replaced
/// with a placeholder so keys neither reach the logs nor explode label
/// cardinality.
pub(crate) fn normalize_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/secret/") {
        if !rest.is_empty() {
            return "/secret/{id}".to_string();
        }
    }

    match UUID_PATTERN.as_ref() {
        Some(pattern) => pattern.replace_all(path, "{id}").to_string(),
        None => path.to_string(),
    }
}

/// Observability middleware for Axum.
///
/// Wraps every request with a tracing span, records Prometheus metrics and
/// logs completion.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let normalized_path = normalize_path(request.uri().path());

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.route = %normalized_path,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    let status = response.status();

    if let Some(m) = metrics() {
        m.record_http_request(
            method.as_str(),
            &normalized_path,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    tracing::info!(
        method = %method,
        path = %normalized_path,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
