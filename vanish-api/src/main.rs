//! Vanish API Server Entry Point
//!
//! Loads configuration, builds both storage tiers, injects them into the
//! secret service and starts the Axum HTTP server.

use vanish_api::telemetry::{init_tracing, TelemetryConfig};
use vanish_api::{
    build_cache, build_durable, build_state, create_router, ApiError, ApiResult,
    CacheStoreConfig, DbConfig, ServerConfig,
};
use vanish_core::VanishConfig;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::from_env())?;

    let vanish_config = VanishConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;
    let cache_config = CacheStoreConfig::from_env()?;
    let db_config = DbConfig::from_env();

    let durable = build_durable(server_config.durable_backend, &db_config).await?;
    let cache = build_cache(&cache_config, &vanish_config)?;
    let state = build_state(durable, cache, vanish_config);

    let app = create_router(state, server_config.max_concurrent_requests);

    let addr = server_config.bind_addr;
    tracing::info!(%addr, "Starting vanish API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
