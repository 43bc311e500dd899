//! Tier construction and service wiring.
//!
//! Both tiers are built here, once, and injected into `SecretService`.
//! Nothing below this point opens connections of its own.

use std::sync::Arc;

use vanish_core::{SystemClock, VanishConfig};
use vanish_storage::{
    DurableStore, EphemeralCache, InMemoryDurableStore, InMemoryEphemeralCache,
    LmdbEphemeralCache, SecretService,
};

use crate::config::{CacheBackend, CacheStoreConfig, DurableBackend};
use crate::db::{DbConfig, PgDurableStore};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Build the durable tier, creating its schema when it is PostgreSQL.
pub async fn build_durable(
    backend: DurableBackend,
    db_config: &DbConfig,
) -> ApiResult<Arc<dyn DurableStore>> {
    match backend {
        DurableBackend::Postgres => {
            let store = PgDurableStore::from_config(db_config)?;
            store.init_schema().await?;
            tracing::info!(
                host = %db_config.host,
                dbname = %db_config.dbname,
                "Durable tier: PostgreSQL"
            );
            Ok(Arc::new(store))
        }
        DurableBackend::Memory => {
            tracing::warn!("Durable tier: in-memory, secrets will not survive a restart");
            Ok(Arc::new(InMemoryDurableStore::new()))
        }
    }
}

/// Build the cache tier with the configured lifetime ceiling.
pub fn build_cache(
    cache_config: &CacheStoreConfig,
    vanish_config: &VanishConfig,
) -> ApiResult<Arc<dyn EphemeralCache>> {
    match cache_config.backend {
        CacheBackend::Lmdb => {
            let cache = LmdbEphemeralCache::new(
                &cache_config.path,
                cache_config.max_size_mb,
                vanish_config.cache_ttl,
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to open cache: {}", e)))?;
            tracing::info!(
                path = %cache_config.path.display(),
                ttl_secs = vanish_config.cache_ttl.as_secs(),
                "Cache tier: LMDB"
            );
            Ok(Arc::new(cache))
        }
        CacheBackend::Memory => {
            tracing::info!(
                ttl_secs = vanish_config.cache_ttl.as_secs(),
                "Cache tier: in-memory"
            );
            Ok(Arc::new(InMemoryEphemeralCache::new(vanish_config.cache_ttl)))
        }
    }
}

/// Wire both tiers into the service and wrap it in application state.
pub fn build_state(
    durable: Arc<dyn DurableStore>,
    cache: Arc<dyn EphemeralCache>,
    vanish_config: VanishConfig,
) -> AppState {
    let service = SecretService::new(durable, cache, Arc::new(SystemClock), vanish_config);
    AppState::new(Arc::new(service))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_build_memory_tiers() -> ApiResult<()> {
        let vanish_config = VanishConfig::default().with_cache_ttl(Duration::from_secs(5));
        let cache_config = CacheStoreConfig {
            backend: CacheBackend::Memory,
            ..CacheStoreConfig::default()
        };

        let durable = build_durable(DurableBackend::Memory, &DbConfig::default()).await?;
        let cache = build_cache(&cache_config, &vanish_config)?;
        assert_eq!(cache.ttl(), Duration::from_secs(5));

        let state = build_state(durable, cache, vanish_config);
        let probe = state.service.probe().await;
        assert!(probe.durable.is_ok());
        assert!(probe.cache.is_ok());
        Ok(())
    }

    #[test]
    fn test_build_lmdb_cache() -> ApiResult<()> {
        let dir = tempfile::TempDir::new()
            .map_err(|e| ApiError::internal_error(format!("temp dir: {}", e)))?;
        let cache_config = CacheStoreConfig {
            backend: CacheBackend::Lmdb,
            path: dir.path().join("cache"),
            max_size_mb: 4,
        };
        let cache = build_cache(&cache_config, &VanishConfig::default())?;
        assert_eq!(cache.ttl(), vanish_core::DEFAULT_CACHE_TTL);
        Ok(())
    }
}
