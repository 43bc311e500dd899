//! HTTP Routes
//!
//! - `POST /secret`, `GET /secret/:key`, `DELETE /secret/:key`
//! - `/health/*` probes
//! - `/metrics` Prometheus exposition

pub mod health;
pub mod secret;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

/// Default bound on in-flight requests.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 1024;

/// Build the full application router.
pub fn create_router(state: AppState, max_concurrent_requests: usize) -> Router {
    Router::new()
        .route("/secret", post(secret::create_secret))
        .route(
            "/secret/:key",
            get(secret::retrieve_secret).delete(secret::delete_secret),
        )
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler))
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests))
        .with_state(state)
}
