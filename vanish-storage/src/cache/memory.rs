//! In-process cache backend.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use vanish_core::{
    CacheEntry, Clock, SecretKey, SecretRecord, StorageError, StoreTier, SystemClock, VanishResult,
};

use super::{within_ceiling, CacheStats};
use crate::traits::EphemeralCache;

/// `HashMap`-backed cache with a fixed lifetime ceiling.
pub struct InMemoryEphemeralCache {
    entries: RwLock<HashMap<SecretKey, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    stats: RwLock<CacheStats>,
}

impl InMemoryEphemeralCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Snapshot of hit, miss and eviction counters.
    ///
    /// Poisoned locks are read through rather than reported as zero.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self
            .stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        stats.entry_count = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len() as u64;
        stats
    }

    fn poisoned() -> StorageError {
        StorageError::LockPoisoned {
            tier: StoreTier::Cache,
        }
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        update(&mut self.stats.write().unwrap_or_else(PoisonError::into_inner));
    }
}

#[async_trait]
impl EphemeralCache for InMemoryEphemeralCache {
    async fn populate(&self, record: &SecretRecord) -> VanishResult<()> {
        let entry = CacheEntry::from_record(record, self.clock.now());
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(record.key, entry);
        Ok(())
    }

    async fn lookup(&self, key: SecretKey) -> VanishResult<Option<CacheEntry>> {
        let now = self.clock.now();
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;

        let Some(entry) = entries.get(&key) else {
            drop(entries);
            self.record(|s| s.misses += 1);
            return Ok(None);
        };

        if within_ceiling(entry.cached_at, self.ttl, now) {
            let entry = entry.clone();
            drop(entries);
            self.record(|s| s.hits += 1);
            return Ok(Some(entry));
        }

        entries.remove(&key);
        drop(entries);
        self.record(|s| {
            s.misses += 1;
            s.evictions += 1;
        });
        Ok(None)
    }

    async fn delete(&self, key: SecretKey) -> VanishResult<bool> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        Ok(entries.remove(&key).is_some())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanish_core::ManualClock;

    fn record() -> SecretRecord {
        SecretRecord {
            key: SecretKey::generate(),
            payload: "TWVvdw==".to_string(),
            passphrase: Some("pw".to_string()),
            expiration: None,
            created_at: chrono::Utc::now(),
        }
    }

    fn cache_with_clock(ttl_secs: u64) -> (InMemoryEphemeralCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = InMemoryEphemeralCache::with_clock(Duration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn test_populate_and_lookup() {
        let (cache, clock) = cache_with_clock(600);
        let r = record();
        cache.populate(&r).await.expect("populate should succeed");

        let entry = cache
            .lookup(r.key)
            .await
            .expect("lookup should succeed")
            .expect("entry should exist");
        assert_eq!(entry.payload, r.payload);
        assert_eq!(entry.passphrase, r.passphrase);
        assert_eq!(entry.cached_at, clock.now());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_entry_lapses_at_ceiling() {
        let (cache, clock) = cache_with_clock(600);
        let r = record();
        cache.populate(&r).await.expect("populate should succeed");

        clock.advance(chrono::Duration::seconds(599));
        assert!(cache.lookup(r.key).await.expect("lookup should succeed").is_some());

        clock.advance(chrono::Duration::seconds(1));
        assert!(cache.lookup(r.key).await.expect("lookup should succeed").is_none());

        let stats = cache.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entry_count, 0);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let (cache, _) = cache_with_clock(600);
        let r = record();
        cache.populate(&r).await.expect("populate should succeed");

        assert!(cache.delete(r.key).await.expect("delete should succeed"));
        assert!(!cache.delete(r.key).await.expect("delete should succeed"));
        assert!(cache.lookup(r.key).await.expect("lookup should succeed").is_none());
    }

    #[tokio::test]
    async fn test_ttl_is_reported() {
        let (cache, _) = cache_with_clock(42);
        assert_eq!(cache.ttl(), Duration::from_secs(42));
    }

    #[tokio::test]
    async fn test_stats_survive_poisoned_locks() {
        let (cache, _) = cache_with_clock(600);
        let r = record();
        cache.populate(&r).await.expect("populate should succeed");
        cache.lookup(r.key).await.expect("lookup should succeed");

        let poisoner = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _entries = cache.entries.write();
                    let _stats = cache.stats.write();
                    panic!("poison the cache locks");
                })
                .join()
        });
        assert!(poisoner.is_err());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entry_count, 1);
    }
}
