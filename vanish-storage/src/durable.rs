//! In-memory durable store.
//!
//! Used by tests and single-process development setups. It honours the full
//! [`DurableStore`] contract, including treating expired rows as absent.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use vanish_core::{
    Clock, SecretKey, SecretRecord, StorageError, StoreTier, SystemClock, Timestamp, VanishResult,
};

use crate::traits::DurableStore;

/// `HashMap`-backed durable store with an injected clock.
pub struct InMemoryDurableStore {
    records: RwLock<HashMap<SecretKey, SecretRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryDurableStore {
    /// Create an empty store reading time from the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of rows held, expired or not.
    ///
    /// Reads through a poisoned lock, so the count reflects the map as it was
    /// left.
    pub fn row_count(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn poisoned() -> StorageError {
        StorageError::LockPoisoned {
            tier: StoreTier::Durable,
        }
    }
}

impl Default for InMemoryDurableStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn create(
        &self,
        payload: String,
        passphrase: Option<String>,
        expiration: Option<Timestamp>,
    ) -> VanishResult<SecretRecord> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;

        let mut key = SecretKey::generate();
        while records.contains_key(&key) {
            key = SecretKey::generate();
        }

        let record = SecretRecord {
            key,
            payload,
            passphrase,
            expiration,
            created_at: self.clock.now(),
        };
        records.insert(key, record.clone());
        Ok(record)
    }

    async fn fetch(&self, key: SecretKey) -> VanishResult<Option<SecretRecord>> {
        let now = self.clock.now();
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.get(&key).filter(|r| !r.is_expired(now)).cloned())
    }

    async fn delete(&self, key: SecretKey) -> VanishResult<bool> {
        Ok(self.take(key).await?.is_some())
    }

    async fn take(&self, key: SecretKey) -> VanishResult<Option<SecretRecord>> {
        let now = self.clock.now();
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        // Expired rows are purged here too, but reported as absent.
        Ok(records.remove(&key).filter(|r| !r.is_expired(now)))
    }
}
