//! Vanish Test Utilities
//!
//! This crate provides:
//! - Fault-injecting tier doubles (FlakyDurable, FlakyCache)
//! - Proptest generators for secret payloads, passphrases and lifetimes
//! - Test fixtures for a fully wired in-memory service
//! - Assertion helpers for `VanishResult`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

// Re-export vanish crates for convenience
pub use vanish_core::*;
pub use vanish_storage::*;

fn injected(tier: StoreTier) -> VanishError {
    StorageError::unavailable(tier, "injected failure").into()
}

// ============================================================================
// FAULT-INJECTING DURABLE STORE
// ============================================================================

/// In-memory durable store that can be switched into a failing state.
///
/// While `down`, every operation returns `StorageError::Unavailable`.
pub struct FlakyDurable {
    inner: InMemoryDurableStore,
    down: AtomicBool,
}

impl FlakyDurable {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: InMemoryDurableStore::with_clock(clock),
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Number of rows held, expired ones included.
    pub fn row_count(&self) -> usize {
        self.inner.row_count()
    }

    fn check(&self) -> VanishResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(injected(StoreTier::Durable));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStore for FlakyDurable {
    async fn create(
        &self,
        payload: String,
        passphrase: Option<String>,
        expiration: Option<Timestamp>,
    ) -> VanishResult<SecretRecord> {
        self.check()?;
        self.inner.create(payload, passphrase, expiration).await
    }

    async fn fetch(&self, key: SecretKey) -> VanishResult<Option<SecretRecord>> {
        self.check()?;
        self.inner.fetch(key).await
    }

    async fn delete(&self, key: SecretKey) -> VanishResult<bool> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn take(&self, key: SecretKey) -> VanishResult<Option<SecretRecord>> {
        self.check()?;
        self.inner.take(key).await
    }

    async fn ping(&self) -> VanishResult<()> {
        self.check()
    }
}

// ============================================================================
// FAULT-INJECTING CACHE
// ============================================================================

/// In-memory cache with independent failure switches for writes and reads.
pub struct FlakyCache {
    inner: InMemoryEphemeralCache,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl FlakyCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: InMemoryEphemeralCache::with_clock(ttl, clock),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Make `populate` and `delete` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `lookup` and `ping` fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    fn check(&self, flag: &AtomicBool) -> VanishResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(injected(StoreTier::Cache));
        }
        Ok(())
    }
}

#[async_trait]
impl EphemeralCache for FlakyCache {
    async fn populate(&self, record: &SecretRecord) -> VanishResult<()> {
        self.check(&self.fail_writes)?;
        self.inner.populate(record).await
    }

    async fn lookup(&self, key: SecretKey) -> VanishResult<Option<CacheEntry>> {
        self.check(&self.fail_reads)?;
        self.inner.lookup(key).await
    }

    async fn delete(&self, key: SecretKey) -> VanishResult<bool> {
        self.check(&self.fail_writes)?;
        self.inner.delete(key).await
    }

    fn ttl(&self) -> Duration {
        self.inner.ttl()
    }

    async fn ping(&self) -> VanishResult<()> {
        self.check(&self.fail_reads)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating vanish inputs.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate an arbitrary secret of up to `max` raw bytes.
    pub fn arb_secret_bytes(max: usize) -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 0..=max)
    }

    /// Generate a printable secret, as an HTTP client would send one.
    pub fn arb_secret_text() -> impl Strategy<Value = String> {
        "[ -~]{0,256}"
    }

    /// Generate a non-empty passphrase.
    pub fn arb_passphrase() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9!@#%^&*]{1,32}"
    }

    /// Generate an optional passphrase.
    pub fn arb_optional_passphrase() -> impl Strategy<Value = Option<String>> {
        proptest::option::of(arb_passphrase())
    }

    /// Generate a lifetime accepted by the default configuration.
    pub fn arb_ttl_seconds() -> impl Strategy<Value = i64> {
        let max = DEFAULT_MAX_LIFETIME.as_secs() as i64;
        1..=max
    }

    /// Generate a lifetime that create must reject.
    pub fn arb_invalid_ttl_seconds() -> impl Strategy<Value = i64> {
        let max = DEFAULT_MAX_LIFETIME.as_secs() as i64;
        prop_oneof![i64::MIN..=0i64, (max + 1)..=i64::MAX]
    }

    /// Generate a random SecretKey.
    pub fn arb_secret_key() -> impl Strategy<Value = SecretKey> {
        any::<[u8; 16]>().prop_map(|bytes| SecretKey::from_uuid(Uuid::from_bytes(bytes)))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use chrono::Utc;

    /// A service over flaky in-memory tiers sharing one manual clock.
    pub struct TestTiers {
        pub clock: Arc<ManualClock>,
        pub durable: Arc<FlakyDurable>,
        pub cache: Arc<FlakyCache>,
        pub service: Arc<SecretService>,
    }

    impl TestTiers {
        /// Advance the shared clock by whole seconds.
        pub fn advance_secs(&self, secs: i64) {
            self.clock.advance(chrono::Duration::seconds(secs));
        }
    }

    /// Config with the default limits and a ten-minute cache ceiling.
    pub fn test_config() -> VanishConfig {
        VanishConfig::default()
    }

    /// Wire a service with the given configuration.
    pub fn tiers_with_config(config: VanishConfig) -> TestTiers {
        let clock = Arc::new(ManualClock::starting_now());
        let durable = Arc::new(FlakyDurable::new(clock.clone()));
        let cache = Arc::new(FlakyCache::new(config.cache_ttl, clock.clone()));
        let service = Arc::new(SecretService::new(
            durable.clone(),
            cache.clone(),
            clock.clone(),
            config,
        ));
        TestTiers {
            clock,
            durable,
            cache,
            service,
        }
    }

    /// Wire a service with [`test_config`].
    pub fn test_tiers() -> TestTiers {
        tiers_with_config(test_config())
    }

    /// A durable record with no passphrase and no expiration.
    pub fn plain_record() -> SecretRecord {
        SecretRecord {
            key: SecretKey::generate(),
            payload: codec::encode(b"hunter2"),
            passphrase: None,
            expiration: None,
            created_at: Utc::now(),
        }
    }

    /// A passphrase-protected record expiring in one hour.
    pub fn protected_record() -> SecretRecord {
        let now = Utc::now();
        SecretRecord {
            key: SecretKey::generate(),
            payload: codec::encode(b"launch codes"),
            passphrase: Some("open sesame".to_string()),
            expiration: Some(now + chrono::Duration::hours(1)),
            created_at: now,
        }
    }
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

pub mod assertions {
    //! Assertion functions for vanish-specific outcomes.

    use super::*;

    /// Assert that a VanishResult is NotFound.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &VanishResult<T>) {
        match result {
            Err(VanishError::NotFound) => {}
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    /// Assert that a VanishResult is Forbidden.
    #[track_caller]
    pub fn assert_forbidden<T: std::fmt::Debug>(result: &VanishResult<T>) {
        match result {
            Err(VanishError::Forbidden) => {}
            other => panic!("Expected Forbidden, got: {:?}", other),
        }
    }

    /// Assert that a VanishResult is an Unavailable error from `tier`.
    #[track_caller]
    pub fn assert_unavailable<T: std::fmt::Debug>(result: &VanishResult<T>, tier: StoreTier) {
        match result {
            Err(VanishError::Storage(StorageError::Unavailable { tier: t, .. })) if *t == tier => {}
            other => panic!("Expected {} Unavailable, got: {:?}", tier.as_str(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::assertions::*;
    use super::fixtures::*;
    use super::generators::*;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixture_records() {
        assert!(plain_record().passphrase.is_none());
        let protected = protected_record();
        assert!(protected.passphrase_matches(Some("open sesame")));
        assert!(!protected.passphrase_matches(None));
    }

    #[tokio::test]
    async fn test_flaky_durable_switch() {
        let tiers = test_tiers();
        tiers.durable.set_down(true);
        assert_unavailable(&tiers.durable.ping().await, StoreTier::Durable);
        tiers.durable.set_down(false);
        assert!(tiers.durable.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_flaky_cache_switches_are_independent() {
        let tiers = test_tiers();
        let record = plain_record();

        tiers.cache.set_fail_writes(true);
        assert_unavailable(&tiers.cache.populate(&record).await, StoreTier::Cache);
        assert!(tiers.cache.lookup(record.key).await.is_ok());

        tiers.cache.set_fail_writes(false);
        tiers.cache.set_fail_reads(true);
        assert!(tiers.cache.populate(&record).await.is_ok());
        assert_unavailable(&tiers.cache.lookup(record.key).await, StoreTier::Cache);
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_found() {
        let tiers = test_tiers();
        let result = tiers.service.retrieve(SecretKey::generate()).await;
        assert_not_found(&result);
    }

    #[tokio::test]
    async fn test_wrong_passphrase_delete_is_forbidden() {
        let tiers = test_tiers();
        let created = tiers
            .service
            .create(b"guarded", Some("open sesame".to_string()), None)
            .await
            .expect("create should succeed");

        assert_forbidden(&tiers.service.delete(created.key, Some("closed")).await);
        assert_forbidden(&tiers.service.delete(created.key, None).await);
        assert_eq!(tiers.durable.row_count(), 1);
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime should build")
            .block_on(future)
    }

    proptest! {
        #[test]
        fn prop_generated_secrets_read_back_once(secret in arb_secret_bytes(DEFAULT_MAX_SECRET_BYTES)) {
            let (first, second) = block_on(async {
                let tiers = test_tiers();
                let created = tiers.service.create(&secret, None, None).await
                    .expect("create should succeed");
                let first = tiers.service.retrieve(created.key).await;
                (first, tiers.service.retrieve(created.key).await)
            });
            prop_assert_eq!(first.map(|read| read.secret), Ok(secret));
            assert_not_found(&second);
        }

        #[test]
        fn prop_unknown_keys_are_not_found(key in arb_secret_key()) {
            let (retrieved, deleted) = block_on(async {
                let tiers = test_tiers();
                (
                    tiers.service.retrieve(key).await,
                    tiers.service.delete(key, None).await,
                )
            });
            assert_not_found(&retrieved);
            assert_not_found(&deleted);
        }

        #[test]
        fn prop_generated_ttls_are_accepted(ttl in arb_ttl_seconds()) {
            prop_assert!(ttl >= 1);
            prop_assert!(ttl as u64 <= DEFAULT_MAX_LIFETIME.as_secs());
        }

        #[test]
        fn prop_invalid_ttls_are_out_of_range(ttl in arb_invalid_ttl_seconds()) {
            prop_assert!(ttl < 1 || ttl as u64 > DEFAULT_MAX_LIFETIME.as_secs());
        }

        #[test]
        fn prop_passphrases_are_non_empty(p in arb_passphrase()) {
            prop_assert!(!p.is_empty());
        }
    }
}
