//! LMDB-backed cache implementation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a memory-mapped
//! key-value store for cache mirrors of secrets.
//!
//! # Layout
//!
//! Keys are the 16 raw bytes of the [`SecretKey`]. Values are
//! `[cached_at: 8 bytes little-endian millis][json CacheEntry]`; the header
//! alone decides whether an entry is still inside the ceiling.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The backend uses read transactions for
//! lookups and write transactions for populate and delete. Statistics are
//! kept behind a lock that is read through if poisoned.
//!
//! A value that no longer decodes is logged, removed and reported as a miss,
//! so the durable tier still serves the secret.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use vanish_core::{
    CacheEntry, Clock, SecretKey, SecretRecord, StorageError, StoreTier, SystemClock, Timestamp,
    VanishError, VanishResult,
};

use super::{within_ceiling, CacheStats};
use crate::traits::EphemeralCache;

const HEADER_LEN: usize = 8;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored bytes do not decode to an entry.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for VanishError {
    fn from(e: LmdbCacheError) -> Self {
        match e {
            LmdbCacheError::Deserialization(reason) => VanishError::Storage(StorageError::Corrupted {
                tier: StoreTier::Cache,
                reason,
            }),
            other => VanishError::Storage(StorageError::unavailable(StoreTier::Cache, other)),
        }
    }
}

/// LMDB-backed ephemeral cache.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use vanish_storage::cache::LmdbEphemeralCache;
///
/// let cache = LmdbEphemeralCache::new("/var/lib/vanish/cache", 100, Duration::from_secs(600))?;
/// cache.populate(&record).await?;
/// let entry = cache.lookup(record.key).await?;
/// ```
pub struct LmdbEphemeralCache {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    stats: RwLock<CacheStats>,
}

impl LmdbEphemeralCache {
    /// Open (or create) a cache environment under `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    /// * `ttl` - Lifetime ceiling for every entry
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the LMDB
    /// environment or database cannot be opened.
    pub fn new<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        ttl: Duration,
    ) -> Result<Self, LmdbCacheError> {
        Self::with_clock(path, max_size_mb, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            ttl,
            clock,
            stats: RwLock::new(CacheStats::default()),
        })
    }

    /// Snapshot of counters; `entry_count` is read from the database.
    pub fn stats(&self) -> Result<CacheStats, LmdbCacheError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let entry_count = self
            .db
            .len(&rtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let mut stats = self
            .stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        stats.entry_count = entry_count;
        Ok(stats)
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        update(&mut self.stats.write().unwrap_or_else(PoisonError::into_inner));
    }

    /// Store raw bytes under `key`, bypassing the value layout.
    #[cfg(test)]
    pub(crate) fn put_raw(&self, key: SecretKey, bytes: &[u8]) -> Result<(), LmdbCacheError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        self.db
            .put(&mut wtxn, key.as_bytes(), bytes)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))
    }

    fn encode_value(entry: &CacheEntry) -> Result<Vec<u8>, LmdbCacheError> {
        let value_bytes =
            serde_json::to_vec(entry).map_err(|e| LmdbCacheError::Serialization(e.to_string()))?;

        let mut full_bytes = Vec::with_capacity(HEADER_LEN + value_bytes.len());
        full_bytes.extend_from_slice(&entry.cached_at.timestamp_millis().to_le_bytes());
        full_bytes.extend_from_slice(&value_bytes);
        Ok(full_bytes)
    }

    fn decode_value(bytes: &[u8]) -> Result<(Timestamp, CacheEntry), LmdbCacheError> {
        if bytes.len() < HEADER_LEN {
            return Err(LmdbCacheError::Deserialization(format!(
                "value is {} bytes, shorter than the header",
                bytes.len()
            )));
        }

        let timestamp_bytes: [u8; HEADER_LEN] = bytes[0..HEADER_LEN]
            .try_into()
            .map_err(|_| LmdbCacheError::Deserialization("Invalid timestamp".into()))?;
        let cached_at = DateTime::from_timestamp_millis(i64::from_le_bytes(timestamp_bytes))
            .ok_or_else(|| LmdbCacheError::Deserialization("Timestamp out of range".into()))?;

        let entry: CacheEntry = serde_json::from_slice(&bytes[HEADER_LEN..])
            .map_err(|e| LmdbCacheError::Deserialization(e.to_string()))?;

        Ok((cached_at, entry))
    }

    fn remove(&self, key: &[u8]) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let deleted = self
            .db
            .delete(&mut wtxn, key)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(deleted)
    }
}

#[async_trait]
impl EphemeralCache for LmdbEphemeralCache {
    async fn populate(&self, record: &SecretRecord) -> VanishResult<()> {
        let entry = CacheEntry::from_record(record, self.clock.now());
        let full_bytes = Self::encode_value(&entry)?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, record.key.as_bytes(), &full_bytes)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn lookup(&self, key: SecretKey) -> VanishResult<Option<CacheEntry>> {
        let now = self.clock.now();

        let decoded = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

            match self
                .db
                .get(&rtxn, key.as_bytes())
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?
            {
                Some(bytes) => Some(Self::decode_value(bytes)),
                None => None,
            }
        };

        match decoded {
            Some(Err(e)) => {
                tracing::error!(key = %key, error = %e, "Dropping undecodable cache entry");
                self.remove(key.as_bytes())?;
                self.record(|s| {
                    s.misses += 1;
                    s.corruptions += 1;
                });
                Ok(None)
            }
            None => {
                self.record(|s| s.misses += 1);
                Ok(None)
            }
            Some(Ok((cached_at, entry))) if within_ceiling(cached_at, self.ttl, now) => {
                self.record(|s| s.hits += 1);
                Ok(Some(entry))
            }
            Some(Ok(_)) => {
                self.remove(key.as_bytes())?;
                self.record(|s| {
                    s.misses += 1;
                    s.evictions += 1;
                });
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: SecretKey) -> VanishResult<bool> {
        Ok(self.remove(key.as_bytes())?)
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn ping(&self) -> VanishResult<()> {
        let _rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        Ok(())
    }
}
