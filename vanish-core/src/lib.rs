//! Vanish Core - Secret Types
//!
//! Data structures, the payload codec and the error taxonomy shared by the
//! storage tiers and the API layer. No I/O happens in this crate.

pub mod codec;
pub mod config;
pub mod entities;
pub mod error;
pub mod identity;

pub use config::{
    VanishConfig, DEFAULT_CACHE_TTL, DEFAULT_MAX_LIFETIME, DEFAULT_MAX_SECRET_BYTES,
    MAX_LIFETIME_CEILING,
};
pub use entities::{passphrase_matches, CacheEntry, SecretRecord};
pub use error::{
    CodecError, ConfigError, StorageError, StoreTier, ValidationError, VanishError, VanishResult,
};
pub use identity::{Clock, ManualClock, SecretKey, SystemClock, Timestamp};
