//! API Configuration Module
//!
//! Server and tier-backend settings loaded from environment variables with
//! defaults suitable for development. Lifecycle settings (cache TTL, size and
//! lifetime limits) live in `vanish_core::VanishConfig`.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// BACKEND SELECTION
// ============================================================================

/// Which implementation backs the durable tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurableBackend {
    Postgres,
    /// Process-local; secrets do not survive a restart.
    Memory,
}

/// Which implementation backs the cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Lmdb,
    Memory,
}

impl DurableBackend {
    fn parse(value: &str) -> ApiResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(ApiError::invalid_input(format!(
                "Invalid VANISH_DURABLE_BACKEND value: {}",
                other
            ))),
        }
    }
}

impl CacheBackend {
    fn parse(value: &str) -> ApiResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lmdb" => Ok(Self::Lmdb),
            "memory" => Ok(Self::Memory),
            other => Err(ApiError::invalid_input(format!(
                "Invalid VANISH_CACHE_BACKEND value: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// CACHE STORE CONFIGURATION
// ============================================================================

/// Location and sizing of the cache tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStoreConfig {
    pub backend: CacheBackend,
    /// Directory holding the LMDB environment.
    pub path: PathBuf,
    /// LMDB map size in megabytes.
    pub max_size_mb: usize,
}

impl Default for CacheStoreConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Lmdb,
            path: PathBuf::from("./data/vanish-cache"),
            max_size_mb: 64,
        }
    }
}

impl CacheStoreConfig {
    /// Environment variables:
    /// - `VANISH_CACHE_BACKEND`: `lmdb` (default) or `memory`
    /// - `VANISH_CACHE_PATH`: LMDB directory (default: `./data/vanish-cache`)
    /// - `VANISH_CACHE_MAX_SIZE_MB`: LMDB map size (default: 64)
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();
        let backend = match std::env::var("VANISH_CACHE_BACKEND") {
            Ok(value) => CacheBackend::parse(&value)?,
            Err(_) => defaults.backend,
        };

        let config = Self {
            backend,
            path: std::env::var("VANISH_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            max_size_mb: std::env::var("VANISH_CACHE_MAX_SIZE_MB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size_mb),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ApiResult<()> {
        if self.max_size_mb == 0 {
            return Err(ApiError::invalid_input(
                "VANISH_CACHE_MAX_SIZE_MB must be greater than 0",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SERVER CONFIGURATION
// ============================================================================

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub durable_backend: DurableBackend,
    /// Upper bound on in-flight requests.
    pub max_concurrent_requests: usize,
}

impl ServerConfig {
    /// Environment variables:
    /// - `VANISH_API_BIND`: host to bind (default: `0.0.0.0`)
    /// - `PORT` or `VANISH_API_PORT`: port (default: 3000)
    /// - `VANISH_DURABLE_BACKEND`: `postgres` (default) or `memory`
    /// - `VANISH_MAX_CONCURRENT_REQUESTS`: default 1024
    pub fn from_env() -> ApiResult<Self> {
        let durable_backend = match std::env::var("VANISH_DURABLE_BACKEND") {
            Ok(value) => DurableBackend::parse(&value)?,
            Err(_) => DurableBackend::Postgres,
        };

        Ok(Self {
            bind_addr: resolve_bind_addr()?,
            durable_backend,
            max_concurrent_requests: std::env::var("VANISH_MAX_CONCURRENT_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(1024),
        })
    }
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("VANISH_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("VANISH_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    bind_addr_from(&host, &port_str)
}

fn bind_addr_from(host: &str, port_str: &str) -> ApiResult<SocketAddr> {
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
