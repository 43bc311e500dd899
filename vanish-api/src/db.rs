//! PostgreSQL Durable Store
//!
//! Connection pooling via deadpool-postgres and the `vanish_secret` table
//! that backs the authoritative tier. Expired rows are never returned; they
//! stay on disk until a delete or take touches them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::{NoTls, Row};
use vanish_core::{
    Clock, SecretKey, SecretRecord, StorageError, StoreTier, SystemClock, Timestamp, VanishError,
    VanishResult,
};
use vanish_storage::DurableStore;

use crate::error::{ApiError, ApiResult};

const MAX_KEY_ATTEMPTS: usize = 3;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vanish_secret (
    secret_key      UUID PRIMARY KEY,
    secret          TEXT NOT NULL,
    passphrase      TEXT NULL,
    expiration_date TIMESTAMPTZ NULL,
    created_at      TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS vanish_secret_expiration_idx
    ON vanish_secret (expiration_date)
    WHERE expiration_date IS NOT NULL;
";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Time to wait for a pooled connection
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "vanish".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("VANISH_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("VANISH_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("VANISH_DB_NAME").unwrap_or_else(|_| "vanish".to_string()),
            user: std::env::var("VANISH_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("VANISH_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("VANISH_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("VANISH_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DURABLE STORE
// ============================================================================

/// `DurableStore` backed by the `vanish_secret` table.
#[derive(Clone)]
pub struct PgDurableStore {
    pool: Pool,
    clock: Arc<dyn Clock>,
}

impl PgDurableStore {
    /// Create a store over an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: Pool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Create a store from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create the table and index if they do not exist.
    pub async fn init_schema(&self) -> ApiResult<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute(SCHEMA).await?;
        tracing::info!("Durable schema ready");
        Ok(())
    }

    async fn get_conn(&self) -> VanishResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(unavailable)
    }
}

fn unavailable(e: impl std::fmt::Display) -> VanishError {
    StorageError::unavailable(StoreTier::Durable, e).into()
}

fn corrupted(e: impl std::fmt::Display) -> VanishError {
    StorageError::Corrupted {
        tier: StoreTier::Durable,
        reason: e.to_string(),
    }
    .into()
}

/// Build a record from a row of `(secret, passphrase, expiration_date, created_at)`.
fn record_from_row(key: SecretKey, row: &Row) -> VanishResult<SecretRecord> {
    Ok(SecretRecord {
        key,
        payload: row.try_get("secret").map_err(corrupted)?,
        passphrase: row.try_get("passphrase").map_err(corrupted)?,
        expiration: row.try_get("expiration_date").map_err(corrupted)?,
        created_at: row.try_get("created_at").map_err(corrupted)?,
    })
}

#[async_trait]
impl DurableStore for PgDurableStore {
    async fn create(
        &self,
        payload: String,
        passphrase: Option<String>,
        expiration: Option<Timestamp>,
    ) -> VanishResult<SecretRecord> {
        let conn = self.get_conn().await?;
        let created_at = self.clock.now();

        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = SecretKey::generate();
            let inserted = conn
                .execute(
                    "INSERT INTO vanish_secret (secret_key, secret, passphrase, expiration_date, created_at)
                     VALUES ($1, $2, $3, $4, $5)
                     ON CONFLICT (secret_key) DO NOTHING",
                    &[&key.as_uuid(), &payload, &passphrase, &expiration, &created_at],
                )
                .await
                .map_err(unavailable)?;

            if inserted == 1 {
                return Ok(SecretRecord {
                    key,
                    payload,
                    passphrase,
                    expiration,
                    created_at,
                });
            }
            tracing::warn!(key = %key, "Generated key collided, regenerating");
        }

        Err(unavailable("could not allocate a unique secret key"))
    }

    async fn fetch(&self, key: SecretKey) -> VanishResult<Option<SecretRecord>> {
        let conn = self.get_conn().await?;
        let now = self.clock.now();

        let row = conn
            .query_opt(
                "SELECT secret, passphrase, expiration_date, created_at
                 FROM vanish_secret
                 WHERE secret_key = $1
                   AND (expiration_date IS NULL OR expiration_date > $2)",
                &[&key.as_uuid(), &now],
            )
            .await
            .map_err(unavailable)?;

        row.map(|r| record_from_row(key, &r)).transpose()
    }

    async fn delete(&self, key: SecretKey) -> VanishResult<bool> {
        let conn = self.get_conn().await?;
        let now = self.clock.now();

        let row = conn
            .query_opt(
                "DELETE FROM vanish_secret WHERE secret_key = $1 RETURNING expiration_date",
                &[&key.as_uuid()],
            )
            .await
            .map_err(unavailable)?;

        match row {
            None => Ok(false),
            Some(row) => {
                let expiration: Option<Timestamp> =
                    row.try_get("expiration_date").map_err(corrupted)?;
                Ok(!matches!(expiration, Some(at) if now >= at))
            }
        }
    }

    async fn take(&self, key: SecretKey) -> VanishResult<Option<SecretRecord>> {
        let conn = self.get_conn().await?;
        let now = self.clock.now();

        let row = conn
            .query_opt(
                "DELETE FROM vanish_secret
                 WHERE secret_key = $1
                 RETURNING secret, passphrase, expiration_date, created_at",
                &[&key.as_uuid()],
            )
            .await
            .map_err(unavailable)?;

        match row {
            None => Ok(None),
            Some(row) => {
                let record = record_from_row(key, &row)?;
                Ok((!record.is_expired(now)).then_some(record))
            }
        }
    }

    async fn ping(&self) -> VanishResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(unavailable)?;
        Ok(())
    }
}
