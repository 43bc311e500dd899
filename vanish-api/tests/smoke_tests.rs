//! End-to-end smoke tests against a live PostgreSQL durable tier
//!
//! Run with `--features db-tests` and the `VANISH_DB_*` variables pointing
//! at a scratch database.

#![cfg(feature = "db-tests")]

use std::sync::Arc;

use vanish_api::{ApiResult, DbConfig, PgDurableStore};
use vanish_core::*;
use vanish_storage::{DurableStore, InMemoryEphemeralCache, SecretService};

async fn test_store() -> ApiResult<PgDurableStore> {
    let store = PgDurableStore::from_config(&DbConfig::from_env())?;
    store.init_schema().await?;
    Ok(store)
}

#[tokio::test]
async fn smoke_test_durable_round_trip() -> ApiResult<()> {
    let store = test_store().await?;

    let record = store
        .create(codec::encode(b"smoke"), Some("pw".to_string()), None)
        .await?;
    let fetched = store.fetch(record.key).await?;
    assert_eq!(fetched.as_ref().map(|r| r.payload.as_str()), Some(record.payload.as_str()));

    let taken = store.take(record.key).await?;
    assert!(taken.is_some());
    assert!(store.take(record.key).await?.is_none());
    assert!(!store.delete(record.key).await?);
    Ok(())
}

#[tokio::test]
async fn smoke_test_expired_row_is_invisible() -> ApiResult<()> {
    let store = test_store().await?;
    let past = chrono::Utc::now() - chrono::Duration::seconds(5);

    let record = store.create(codec::encode(b"old"), None, Some(past)).await?;
    assert!(store.fetch(record.key).await?.is_none());
    assert!(store.take(record.key).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn smoke_test_service_over_postgres() -> ApiResult<()> {
    let store = test_store().await?;
    let config = VanishConfig::default();
    let service = SecretService::new(
        Arc::new(store),
        Arc::new(InMemoryEphemeralCache::new(config.cache_ttl)),
        Arc::new(SystemClock),
        config,
    );

    let created = service.create(b"Meow", Some("Woof".to_string()), Some(600)).await?;
    assert!(matches!(
        service.delete(created.key, Some("Meow")).await,
        Err(VanishError::Forbidden)
    ));
    let status = service.delete(created.key, Some("Woof")).await?;
    assert!(status.durable_removed);
    assert!(matches!(
        service.retrieve(created.key).await,
        Err(VanishError::NotFound)
    ));
    Ok(())
}
