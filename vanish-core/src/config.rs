//! Service configuration

use std::time::Duration;

use crate::error::{ConfigError, VanishError, VanishResult};

/// Default ceiling on how long the cache mirror of a secret is trusted.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Default upper bound on a requested secret lifetime (7 days).
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Hard cap on `max_lifetime` (100 years); keeps expirations representable.
pub const MAX_LIFETIME_CEILING: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Default upper bound on raw secret size.
pub const DEFAULT_MAX_SECRET_BYTES: usize = 64 * 1024;

/// Settings that shape secret lifecycle behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VanishConfig {
    /// Fixed cache lifetime ceiling, independent of the requested lifetime.
    pub cache_ttl: Duration,
    /// Longest lifetime a creator may request.
    pub max_lifetime: Duration,
    /// Largest raw secret accepted on create.
    pub max_secret_bytes: usize,
}

impl Default for VanishConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            max_lifetime: DEFAULT_MAX_LIFETIME,
            max_secret_bytes: DEFAULT_MAX_SECRET_BYTES,
        }
    }
}

impl VanishConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `VANISH_CACHE_TTL_SECS`: cache lifetime ceiling (default: 600)
    /// - `VANISH_MAX_LIFETIME_SECS`: maximum requested lifetime (default: 604800)
    /// - `VANISH_MAX_SECRET_BYTES`: maximum raw secret size (default: 65536)
    pub fn from_env() -> VanishResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults,
    /// unparsable ones are rejected.
    pub fn from_lookup<F>(lookup: F) -> VanishResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            cache_ttl: parse_var(&lookup, "VANISH_CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            max_lifetime: parse_var(&lookup, "VANISH_MAX_LIFETIME_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_lifetime),
            max_secret_bytes: parse_var::<usize, _>(&lookup, "VANISH_MAX_SECRET_BYTES")?
                .unwrap_or(defaults.max_secret_bytes),
        };

        config.validate()?;
        Ok(config)
    }

    /// Set the cache lifetime ceiling.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the maximum requested lifetime.
    pub fn with_max_lifetime(mut self, max: Duration) -> Self {
        self.max_lifetime = max;
        self
    }

    /// Set the maximum raw secret size.
    pub fn with_max_secret_bytes(mut self, max: usize) -> Self {
        self.max_secret_bytes = max;
        self
    }

    /// Validate the configuration.
    ///
    /// Every duration and size must be positive.
    pub fn validate(&self) -> VanishResult<()> {
        if self.cache_ttl.is_zero() {
            return Err(invalid("cache_ttl", format!("{:?}", self.cache_ttl), "cache_ttl must be positive"));
        }

        if self.max_lifetime.is_zero() {
            return Err(invalid(
                "max_lifetime",
                format!("{:?}", self.max_lifetime),
                "max_lifetime must be positive",
            ));
        }

        if self.max_lifetime > MAX_LIFETIME_CEILING {
            return Err(invalid(
                "max_lifetime",
                format!("{:?}", self.max_lifetime),
                "max_lifetime must not exceed 100 years",
            ));
        }

        if self.max_secret_bytes == 0 {
            return Err(invalid(
                "max_secret_bytes",
                self.max_secret_bytes.to_string(),
                "max_secret_bytes must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: String, reason: &str) -> VanishError {
    VanishError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value,
        reason: reason.to_string(),
    })
}

fn parse_var<T, F>(lookup: &F, name: &str) -> VanishResult<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(name, raw.clone(), "expected a non-negative integer")),
    }
}
