//! Ephemeral cache tier.
//!
//! Every entry is trusted for at most [`EphemeralCache::ttl`](crate::EphemeralCache::ttl)
//! after it was populated, whatever lifetime the creator asked for. Entries
//! past that ceiling are treated as absent and evicted on the next lookup.
//!
//! Two backends are provided: [`InMemoryEphemeralCache`] for tests and single
//! process setups, and [`LmdbEphemeralCache`] for a memory-mapped store that
//! survives restarts.

pub mod lmdb_backend;
pub mod memory;

pub use lmdb_backend::{LmdbCacheError, LmdbEphemeralCache};
pub use memory::InMemoryEphemeralCache;

use std::time::Duration;

use vanish_core::Timestamp;

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that returned a live entry.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Number of entries currently stored.
    pub entry_count: u64,
    /// Entries dropped because they outlived the ceiling.
    pub evictions: u64,
    /// Entries dropped because their stored bytes no longer decode.
    pub corruptions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Whether an entry populated at `cached_at` is still inside `ttl` at `now`.
///
/// The boundary is exclusive: at exactly `cached_at + ttl` the entry is gone.
pub(crate) fn within_ceiling(cached_at: Timestamp, ttl: Duration, now: Timestamp) -> bool {
    let Ok(ttl) = chrono::Duration::from_std(ttl) else {
        return true;
    };
    match cached_at.checked_add_signed(ttl) {
        Some(deadline) => now < deadline,
        None => true,
    }
}
