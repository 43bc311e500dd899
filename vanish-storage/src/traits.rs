//! Storage tier traits.
//!
//! The service talks to both tiers only through these traits. Connections,
//! pools and environments are owned by the implementations and handed to
//! the service already constructed.

use std::time::Duration;

use async_trait::async_trait;
use vanish_core::{CacheEntry, SecretKey, SecretRecord, Timestamp, VanishResult};

/// Authoritative, persistent record store.
///
/// An expired record must behave exactly like an absent one for every
/// read: implementations may purge it lazily but never return it.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Persist a new record under a freshly generated key.
    ///
    /// Returns the stored record, including its key. Infrastructure
    /// failures surface as `StorageError::Unavailable`; nothing is retried.
    async fn create(
        &self,
        payload: String,
        passphrase: Option<String>,
        expiration: Option<Timestamp>,
    ) -> VanishResult<SecretRecord>;

    /// Point lookup of a live record.
    async fn fetch(&self, key: SecretKey) -> VanishResult<Option<SecretRecord>>;

    /// Remove the record if present.
    ///
    /// Returns whether a live record was actually removed. Calling this on
    /// an absent or expired key is a no-op returning `false`.
    async fn delete(&self, key: SecretKey) -> VanishResult<bool>;

    /// Fetch and remove the live record in one atomic step.
    ///
    /// Two concurrent callers can never both receive the same record.
    async fn take(&self, key: SecretKey) -> VanishResult<Option<SecretRecord>>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> VanishResult<()> {
        Ok(())
    }
}

/// Time-bounded mirror of recently created secrets.
///
/// The cache enforces only its own lifetime ceiling ([`EphemeralCache::ttl`]),
/// measured from the moment of population.
#[async_trait]
pub trait EphemeralCache: Send + Sync {
    /// Write-through store of the mirror for `record`.
    async fn populate(&self, record: &SecretRecord) -> VanishResult<()>;

    /// Look up a mirror still within the cache ceiling.
    async fn lookup(&self, key: SecretKey) -> VanishResult<Option<CacheEntry>>;

    /// Remove the mirror if present; returns whether anything was removed.
    async fn delete(&self, key: SecretKey) -> VanishResult<bool>;

    /// The fixed lifetime ceiling applied to every entry.
    fn ttl(&self) -> Duration;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> VanishResult<()> {
        Ok(())
    }
}
