//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use vanish_storage::SecretService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// The orchestration core, with both tiers already injected.
    pub service: Arc<SecretService>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: Arc<SecretService>) -> Self {
        Self {
            service,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<SecretService>, service);
crate::impl_from_ref!(Instant, start_time);
