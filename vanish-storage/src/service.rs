//! One-time secret orchestration across the durable and cache tiers.
//!
//! Per key the lifecycle is `UNCREATED -> LIVE -> CONSUMED`. A consumed key
//! and an expired one are indistinguishable to callers: both report
//! [`VanishError::NotFound`].
//!
//! # Read gate
//!
//! A read returns the secret only when the caller's own durable removal
//! succeeded. On a cache hit both tier deletes run concurrently and the
//! durable delete's result decides the outcome; on a cache miss the durable
//! tier's atomic `take` does. Two racing readers can therefore never both
//! receive the payload.

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use vanish_core::{
    codec, CacheEntry, Clock, SecretKey, StoreTier, Timestamp, ValidationError, VanishConfig,
    VanishError, VanishResult,
};

use crate::traits::{DurableStore, EphemeralCache};

/// Outcome of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSecret {
    pub key: SecretKey,
    pub expires_at: Option<Timestamp>,
    /// Non-fatal problems, e.g. the cache mirror could not be written.
    pub warnings: Vec<String>,
}

/// A consumed secret and the tier that served it.
#[derive(Clone, PartialEq, Eq)]
pub struct RetrievedSecret {
    pub secret: Vec<u8>,
    pub served_from: StoreTier,
}

impl std::fmt::Debug for RetrievedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievedSecret")
            .field("secret", &"<redacted>")
            .field("served_from", &self.served_from)
            .finish()
    }
}

/// Which tiers actually removed something on delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteStatus {
    pub durable_removed: bool,
    pub cache_removed: bool,
}

/// Result of probing both tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierProbe {
    pub durable: VanishResult<()>,
    pub cache: VanishResult<()>,
}

/// Orchestrates create, retrieve and delete over both tiers.
pub struct SecretService {
    durable: Arc<dyn DurableStore>,
    cache: Arc<dyn EphemeralCache>,
    clock: Arc<dyn Clock>,
    config: VanishConfig,
}

impl SecretService {
    pub fn new(
        durable: Arc<dyn DurableStore>,
        cache: Arc<dyn EphemeralCache>,
        clock: Arc<dyn Clock>,
        config: VanishConfig,
    ) -> Self {
        if cache.ttl() != config.cache_ttl {
            tracing::warn!(
                cache_ttl_secs = cache.ttl().as_secs(),
                configured_secs = config.cache_ttl.as_secs(),
                "Cache ceiling differs from configured cache TTL"
            );
        }
        Self {
            durable,
            cache,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &VanishConfig {
        &self.config
    }

    /// Store `secret` and return its key.
    ///
    /// `lifetime_secs` is materialized to an absolute expiration now. The
    /// cache write is best-effort: its failure becomes a warning, never an
    /// error.
    pub async fn create(
        &self,
        secret: &[u8],
        passphrase: Option<String>,
        lifetime_secs: Option<i64>,
    ) -> VanishResult<CreatedSecret> {
        self.validate_create(secret, passphrase.as_deref(), lifetime_secs)?;

        let payload = codec::encode(secret);
        let expiration = lifetime_secs
            .map(|secs| self.expiration_after(secs))
            .transpose()?;
        let has_passphrase = passphrase.is_some();

        let record = self.durable.create(payload, passphrase, expiration).await?;

        let mut warnings = Vec::new();
        if let Err(e) = self.cache.populate(&record).await {
            tracing::warn!(key = %record.key, error = %e, "Cache population failed, secret is durable only");
            warnings.push(format!("cache population failed: {e}"));
        }

        tracing::info!(
            key = %record.key,
            expires_at = ?record.expiration,
            has_passphrase,
            "Secret created"
        );

        Ok(CreatedSecret {
            key: record.key,
            expires_at: record.expiration,
            warnings,
        })
    }

    /// Consume the secret stored under `key`.
    pub async fn retrieve(&self, key: SecretKey) -> VanishResult<RetrievedSecret> {
        if let Some(entry) = self.live_cache_entry(key).await? {
            let secret = codec::decode(&entry.payload)?;

            let (cache_res, durable_res) =
                tokio::join!(self.cache.delete(key), self.durable.delete(key));
            let durable_removed = durable_res?;

            if !durable_removed {
                tracing::debug!(key = %key, "Cache hit lost the durable removal race");
                return Err(VanishError::NotFound);
            }
            if let Err(e) = cache_res {
                tracing::warn!(key = %key, error = %e, "Cache delete failed after durable removal, entry expires at the ceiling");
            }

            tracing::info!(key = %key, tier = "cache", "Secret consumed");
            return Ok(RetrievedSecret {
                secret,
                served_from: StoreTier::Cache,
            });
        }

        let record = self.durable.take(key).await?.ok_or(VanishError::NotFound)?;
        let secret = codec::decode(&record.payload)?;

        tracing::info!(key = %key, tier = "durable", "Secret consumed");
        Ok(RetrievedSecret {
            secret,
            served_from: StoreTier::Durable,
        })
    }

    /// Delete the secret under `key`, gated on `passphrase`.
    ///
    /// A mismatch fails with [`VanishError::Forbidden`] before either tier is
    /// modified.
    pub async fn delete(
        &self,
        key: SecretKey,
        passphrase: Option<&str>,
    ) -> VanishResult<DeleteStatus> {
        let stored = match self.live_cache_entry(key).await? {
            Some(entry) => Some(entry.passphrase),
            None => self.durable.fetch(key).await?.map(|r| r.passphrase),
        };
        let stored = stored.ok_or(VanishError::NotFound)?;

        if !vanish_core::passphrase_matches(stored.as_deref(), passphrase) {
            tracing::info!(key = %key, "Delete rejected: passphrase mismatch");
            return Err(VanishError::Forbidden);
        }

        let (cache_res, durable_res) =
            tokio::join!(self.cache.delete(key), self.durable.delete(key));
        let durable_removed = durable_res?;
        let cache_removed = match cache_res {
            Ok(removed) => removed,
            Err(e) if durable_removed => {
                tracing::warn!(key = %key, error = %e, "Cache delete failed after durable removal, entry expires at the ceiling");
                false
            }
            Err(e) => return Err(e),
        };
        let status = DeleteStatus {
            durable_removed,
            cache_removed,
        };

        if !status.durable_removed && !status.cache_removed {
            return Err(VanishError::NotFound);
        }

        tracing::info!(
            key = %key,
            durable_removed = status.durable_removed,
            cache_removed = status.cache_removed,
            "Secret deleted"
        );
        Ok(status)
    }

    /// Probe both tiers concurrently.
    pub async fn probe(&self) -> TierProbe {
        let (durable, cache) = tokio::join!(self.durable.ping(), self.cache.ping());
        TierProbe { durable, cache }
    }

    /// Cache lookup that refuses entries past their carried durable
    /// expiration, evicting them.
    async fn live_cache_entry(&self, key: SecretKey) -> VanishResult<Option<CacheEntry>> {
        match self.cache.lookup(key).await? {
            Some(entry) if entry.is_expired(self.clock.now()) => {
                tracing::debug!(key = %key, "Evicting cache entry past durable expiration");
                self.cache.delete(key).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn expiration_after(&self, secs: i64) -> Result<Timestamp, ValidationError> {
        ChronoDuration::try_seconds(secs)
            .and_then(|lifetime| self.clock.now().checked_add_signed(lifetime))
            .ok_or_else(|| ValidationError::InvalidLifetime {
                seconds: secs,
                reason: "expiration is out of range".to_string(),
            })
    }

    fn validate_create(
        &self,
        secret: &[u8],
        passphrase: Option<&str>,
        lifetime_secs: Option<i64>,
    ) -> Result<(), ValidationError> {
        if secret.len() > self.config.max_secret_bytes {
            return Err(ValidationError::SecretTooLarge {
                size: secret.len(),
                max: self.config.max_secret_bytes,
            });
        }

        if let Some(seconds) = lifetime_secs {
            if seconds < 1 {
                return Err(ValidationError::InvalidLifetime {
                    seconds,
                    reason: "must be at least 1 second".to_string(),
                });
            }
            let max = self.config.max_lifetime.as_secs();
            if (seconds as u64) > max {
                return Err(ValidationError::InvalidLifetime {
                    seconds,
                    reason: format!("exceeds maximum of {max} seconds"),
                });
            }
        }

        if passphrase.is_some_and(str::is_empty) {
            return Err(ValidationError::EmptyPassphrase);
        }

        Ok(())
    }
}
