// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The two-tier cache service.

use std::{sync::Arc, time::Duration};

use keylatch::KeyLatch;
use tick::{Clock, FutureExt};
use trove_tier::CacheEntry;

use crate::{
    CacheConfig, CacheKey, CacheServiceBuilder, CacheStatistics, CacheValue, Error, ErrorKind, KeyBuilder,
    serializer,
    stats::StatsCounters,
    telemetry::{CacheActivity, CacheOperation, CacheTelemetry, TierName, ext::ClockExt},
    tiers::Tiers,
};

const SERVICE_NAME: TierName = "trove";

/// A typed, two-tier cache with single-flight recomputation.
///
/// Lookups try the local tier, then the distributed tier. Writes go to the
/// distributed tier, then the local tier. A distributed tier that fails is
/// logged at WARN and skipped, so every operation keeps working against the
/// local tier alone.
///
/// Clones share the same tiers, counters and in-flight table.
///
/// # Errors
///
/// Operations only fail for caller mistakes ([`ErrorKind::InvalidKey`],
/// [`ErrorKind::Serialization`]), a failing factory ([`ErrorKind::Factory`]) or
/// an expired deadline ([`ErrorKind::Timeout`]). Tier failures never surface.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tick::Clock;
/// use trove::CacheService;
///
/// # futures::executor::block_on(async {
/// let cache = CacheService::builder(Clock::new_frozen()).build()?;
///
/// cache.set("user:42", &"Ada".to_string(), Some(Duration::from_secs(60))).await?;
/// assert_eq!(cache.get::<String>("user:42").await?, Some("Ada".to_string()));
///
/// let score = cache
///     .get_or_set("score:42", None, || async { Ok::<_, std::io::Error>(7_u32) })
///     .await?;
/// assert_eq!(score, 7);
/// # Ok::<(), trove::Error>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CacheService {
    inner: Arc<ServiceInner>,
}

#[derive(Debug)]
struct ServiceInner {
    keys: KeyBuilder,
    tiers: Tiers,
    latch: KeyLatch<CacheKey>,
    stats: StatsCounters,
    clock: Clock,
    telemetry: CacheTelemetry,
    default_ttl: Duration,
}

impl CacheService {
    /// Returns a builder using `clock` for timestamps, expiry and timeouts.
    #[must_use]
    pub fn builder(clock: Clock) -> CacheServiceBuilder {
        CacheServiceBuilder::new(clock)
    }

    /// Builds a service from deserialized configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Configuration`] if the configuration is invalid or
    /// names a distributed tier this build cannot create.
    pub fn from_config(config: &CacheConfig, clock: Clock) -> Result<Self, Error> {
        CacheServiceBuilder::from_config(config, clock)?.build()
    }

    pub(crate) fn from_parts(keys: KeyBuilder, tiers: Tiers, clock: Clock, telemetry: CacheTelemetry, default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                keys,
                tiers,
                latch: KeyLatch::new(),
                stats: StatsCounters::default(),
                clock,
                telemetry,
                default_ttl,
            }),
        }
    }

    /// The key builder qualifying every logical key.
    #[must_use]
    pub fn key_builder(&self) -> &KeyBuilder {
        &self.inner.keys
    }

    /// The TTL used when a caller passes `None`.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    /// The clock driving timestamps, expiry and timeouts.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    /// Number of keys with a `get_or_set` computation running or queued.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.latch.in_flight()
    }

    /// Looks `key` up as a `T`.
    ///
    /// Unreadable payloads and tier failures are logged and reported as `None`.
    /// Every call counts as one hit or one miss.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidKey`] for a blank key.
    pub async fn get<T: CacheValue>(&self, key: &str) -> Result<Option<T>, Error> {
        let key = self.inner.keys.build::<T>(key)?;
        let found = self.lookup::<T>(&key).await;
        self.count(found.is_some());
        Ok(found)
    }

    /// Stores `value` under `key` in both tiers.
    ///
    /// Both tiers receive the same expiration instant, `now + ttl`, with `ttl`
    /// defaulting to [`default_ttl`](Self::default_ttl). A zero TTL stores
    /// nothing readable.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidKey`] for a blank key and
    /// [`ErrorKind::Serialization`] if `value` cannot be encoded.
    pub async fn set<T: CacheValue>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), Error> {
        let key = self.inner.keys.build::<T>(key)?;
        self.store(&key, value, ttl).await
    }

    /// Removes the `T` stored under `key` from both tiers.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidKey`] for a blank key.
    pub async fn remove<T: CacheValue>(&self, key: &str) -> Result<(), Error> {
        let key = self.inner.keys.build::<T>(key)?;
        self.remove_key(&key).await;
        Ok(())
    }

    /// Removes an already qualified key from both tiers.
    pub async fn remove_key(&self, key: &CacheKey) {
        self.inner.tiers.invalidate(key.as_string()).await;
    }

    /// Reports whether a `T` is stored under `key`, checking the distributed tier first.
    ///
    /// Does not touch the hit and miss counters.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidKey`] for a blank key.
    pub async fn exists<T: CacheValue>(&self, key: &str) -> Result<bool, Error> {
        let key = self.inner.keys.build::<T>(key)?;
        Ok(self.inner.tiers.exists(key.as_string()).await)
    }

    /// Returns the cached `T` for `key`, computing and storing it on a miss.
    ///
    /// Concurrent callers missing on the same key are serialized: one runs
    /// `factory`, the rest wait and then find the stored value. Callers for
    /// other keys are never blocked. A failed factory stores nothing, so the
    /// next waiter runs its own factory. Dropping the returned future releases
    /// its place in line.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Factory`] with the factory's error as source,
    /// [`ErrorKind::InvalidKey`] for a blank key, or
    /// [`ErrorKind::Serialization`] if the computed value cannot be encoded.
    pub async fn get_or_set<T, E, F, Fut>(&self, key: &str, ttl: Option<Duration>, factory: F) -> Result<T, Error>
    where
        T: CacheValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let key = self.inner.keys.build::<T>(key)?;

        if let Some(value) = self.lookup::<T>(&key).await {
            self.count(true);
            return Ok(value);
        }
        self.count(false);

        let _guard = self.inner.latch.acquire(key.clone()).await;

        // Another caller may have stored the value while we waited.
        if let Some(value) = self.lookup::<T>(&key).await {
            return Ok(value);
        }

        let timed = self.inner.clock.measure(factory()).await;
        match timed.value {
            Ok(value) => {
                self.inner
                    .telemetry
                    .record(SERVICE_NAME, CacheOperation::Compute, CacheActivity::Ok, Some(timed.elapsed));
                self.store(&key, &value, ttl).await?;
                Ok(value)
            }
            Err(e) => {
                self.inner
                    .telemetry
                    .record(SERVICE_NAME, CacheOperation::Compute, CacheActivity::Error, Some(timed.elapsed));
                Err(Error::caused_by(ErrorKind::Factory, e))
            }
        }
    }

    /// Like [`get_or_set`](Self::get_or_set), but gives up after `timeout`.
    ///
    /// The deadline covers waiting for another caller's computation as well as
    /// running `factory`. On expiry nothing is stored and the key is released.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Timeout`] when the deadline passes, otherwise the
    /// errors of [`get_or_set`](Self::get_or_set).
    pub async fn get_or_set_with_timeout<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        timeout: Duration,
        factory: F,
    ) -> Result<T, Error>
    where
        T: CacheValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.get_or_set(key, ttl, factory)
            .timeout(&self.inner.clock, timeout)
            .await
            .map_err(|e| Error::caused_by(ErrorKind::Timeout, e))?
    }

    /// Snapshots the counters after checking that the distributed tier is reachable.
    pub async fn statistics(&self) -> CacheStatistics {
        let distributed_available = self.inner.tiers.check_reachable().await;

        CacheStatistics {
            hits: self.inner.stats.hits(),
            misses: self.inner.stats.misses(),
            resident_keys: self.inner.tiers.resident().await,
            distributed_configured: self.inner.tiers.distributed_configured(),
            distributed_available,
            last_updated: self.inner.clock.system_time(),
        }
    }

    /// Wipes the local tier, and the distributed tier when it supports clearing.
    ///
    /// Best effort: entries written concurrently may survive.
    pub async fn clear_all(&self) {
        self.inner.tiers.clear().await;
    }

    /// Whether the last distributed operation or reachability check succeeded.
    #[must_use]
    pub fn distributed_available(&self) -> bool {
        self.inner.tiers.distributed_available()
    }

    async fn lookup<T: CacheValue>(&self, key: &CacheKey) -> Option<T> {
        let entry = self.inner.tiers.get(key.as_string()).await?;
        match serializer::decode::<T>(entry.value()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(trove.key = %key, error = %e, "discarding unreadable cache payload");
                None
            }
        }
    }

    async fn store<T: CacheValue>(&self, key: &CacheKey, value: &T, ttl: Option<Duration>) -> Result<(), Error> {
        let payload = serializer::encode(value)?;
        let mut entry = CacheEntry::with_ttl(payload, ttl.unwrap_or(self.inner.default_ttl));
        entry.set_cached_at(self.inner.clock.system_time());
        self.inner.tiers.insert(key.as_string(), entry).await;
        Ok(())
    }

    fn count(&self, hit: bool) {
        if hit {
            self.inner.stats.hit();
        } else {
            self.inner.stats.miss();
        }
    }
}
