//! Vanish Storage - Tier Traits, Backends and the Secret Service
//!
//! Defines the durable and ephemeral tier abstractions, in-memory and LMDB
//! implementations, and the service that keeps both tiers consistent.
//! The PostgreSQL durable store lives in vanish-api.

pub mod cache;
pub mod durable;
pub mod service;
pub mod traits;

pub use cache::{CacheStats, InMemoryEphemeralCache, LmdbCacheError, LmdbEphemeralCache};
pub use durable::InMemoryDurableStore;
pub use service::{CreatedSecret, DeleteStatus, RetrievedSecret, SecretService, TierProbe};
pub use traits::{DurableStore, EphemeralCache};
