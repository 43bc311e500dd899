//! Stored secret shapes for the durable and cache tiers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::{SecretKey, Timestamp};

/// Check a caller-supplied passphrase against the stored one.
///
/// No stored passphrase means anything goes. A stored passphrase needs an
/// exact, case-sensitive match; a missing candidate never matches.
pub fn passphrase_matches(stored: Option<&str>, candidate: Option<&str>) -> bool {
    match stored {
        None => true,
        Some(expected) => candidate == Some(expected),
    }
}

fn is_past(expiration: Option<Timestamp>, now: Timestamp) -> bool {
    matches!(expiration, Some(at) if now >= at)
}

/// Authoritative record held by the durable store.
///
/// Written once at creation and never updated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub key: SecretKey,
    /// Encoded secret content, opaque to the store.
    pub payload: String,
    pub passphrase: Option<String>,
    /// Absolute expiry; `None` means the record never expires.
    pub expiration: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl SecretRecord {
    /// Whether the record is past its expiration at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        is_past(self.expiration, now)
    }

    pub fn passphrase_matches(&self, candidate: Option<&str>) -> bool {
        passphrase_matches(self.passphrase.as_deref(), candidate)
    }
}

// Payload and passphrase never reach logs.
impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("key", &self.key)
            .field("payload", &"<redacted>")
            .field("has_passphrase", &self.passphrase.is_some())
            .field("expiration", &self.expiration)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Mirror of a [`SecretRecord`] held by the ephemeral cache.
///
/// `expiration` is the durable expiration carried along so readers can
/// refuse an entry the durable tier would already consider gone. The cache
/// itself only enforces its own ceiling, measured from `cached_at`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: String,
    pub passphrase: Option<String>,
    pub expiration: Option<Timestamp>,
    pub cached_at: Timestamp,
}

impl CacheEntry {
    /// Build the cache mirror of `record`, stamped with `cached_at`.
    pub fn from_record(record: &SecretRecord, cached_at: Timestamp) -> Self {
        Self {
            payload: record.payload.clone(),
            passphrase: record.passphrase.clone(),
            expiration: record.expiration,
            cached_at,
        }
    }

    /// Whether the carried durable expiration has passed at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        is_past(self.expiration, now)
    }

    pub fn passphrase_matches(&self, candidate: Option<&str>) -> bool {
        passphrase_matches(self.passphrase.as_deref(), candidate)
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("payload", &"<redacted>")
            .field("has_passphrase", &self.passphrase.is_some())
            .field("expiration", &self.expiration)
            .field("cached_at", &self.cached_at)
            .finish()
    }
}
