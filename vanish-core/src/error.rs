//! Error types for vanish operations

use std::fmt;
use thiserror::Error;

/// Which storage tier an error or event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTier {
    /// The authoritative persistent store.
    Durable,
    /// The time-bounded accelerator in front of it.
    Cache,
}

impl StoreTier {
    /// Stable lowercase label, used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreTier::Durable => "durable",
            StoreTier::Cache => "cache",
        }
    }
}

impl fmt::Display for StoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{tier} store unavailable: {reason}")]
    Unavailable { tier: StoreTier, reason: String },

    #[error("{tier} store holds a corrupted entry: {reason}")]
    Corrupted { tier: StoreTier, reason: String },

    #[error("{tier} store lock poisoned")]
    LockPoisoned { tier: StoreTier },
}

impl StorageError {
    /// Shorthand for an infrastructure failure in `tier`.
    pub fn unavailable(tier: StoreTier, reason: impl fmt::Display) -> Self {
        StorageError::Unavailable {
            tier,
            reason: reason.to_string(),
        }
    }

    /// The tier that produced this error.
    pub fn tier(&self) -> StoreTier {
        match self {
            StorageError::Unavailable { tier, .. }
            | StorageError::Corrupted { tier, .. }
            | StorageError::LockPoisoned { tier } => *tier,
        }
    }
}

/// Payload codec errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Stored payload is not valid base64: {reason}")]
    InvalidPayload { reason: String },
}

/// Request validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Secret is {size} bytes, maximum is {max}")]
    SecretTooLarge { size: usize, max: usize },

    #[error("Invalid lifetime of {seconds}s: {reason}")]
    InvalidLifetime { seconds: i64, reason: String },

    #[error("Passphrase must not be empty")]
    EmptyPassphrase,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all vanish errors.
///
/// `NotFound` deliberately carries no reason: a key that never existed, one
/// already consumed and one that expired are indistinguishable to callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VanishError {
    #[error("Secret not found")]
    NotFound,

    #[error("Invalid passphrase")]
    Forbidden,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl VanishError {
    /// Whether the error is the caller's fault rather than the server's.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VanishError::NotFound | VanishError::Forbidden | VanishError::Validation(_)
        )
    }
}

/// Result type alias for vanish operations.
pub type VanishResult<T> = Result<T, VanishError>;

// =============================================================================
// TESTS
// =============================================================================
