//! Vanish API - HTTP Layer for One-Time Secrets
//!
//! Exposes the secret service over REST (Axum), provides the PostgreSQL
//! durable store, and carries configuration and telemetry for the server
//! binary.

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod macros;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

pub use bootstrap::{build_cache, build_durable, build_state};
pub use config::{CacheBackend, CacheStoreConfig, DurableBackend, ServerConfig};
pub use db::{DbConfig, PgDurableStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::{create_router, DEFAULT_MAX_CONCURRENT_REQUESTS};
pub use state::AppState;
pub use types::*;
