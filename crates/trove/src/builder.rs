// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for [`CacheService`].

use std::time::Duration;

use tick::Clock;
use trove_memory::MemoryTier;
use trove_tier::{CacheTier, DynamicTier, DynamicTierExt};

use crate::{
    CacheConfig, CacheService, Error, ErrorKind, KeyBuilder, PromotionPolicy, TelemetryConfig,
    tiers::{DistributedLimits, Tiers},
    wrapper::TierWrapper,
};

const DEFAULT_NAMESPACE: &str = "towntrek";
const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);
const DEFAULT_DISTRIBUTED_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);
const LOCAL_TIER_NAME: &str = "local";
const DISTRIBUTED_TIER_NAME: &str = "distributed";

/// Composes a [`CacheService`] from its tiers and options.
///
/// Without a [`local`](Self::local) tier an unbounded [`MemoryTier`] is used.
/// Without a [`distributed`](Self::distributed) tier the service runs in
/// local-only mode.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tick::Clock;
/// use trove::{CacheService, MemoryTier, PromotionPolicy};
///
/// let cache = CacheService::builder(Clock::new_frozen())
///     .namespace("reports")
///     .default_ttl(Duration::from_secs(300))
///     .local(MemoryTier::with_capacity(10_000))
///     .promotion_policy(PromotionPolicy::Never)
///     .build()?;
/// assert_eq!(cache.key_builder().namespace(), "reports");
/// # Ok::<(), trove::Error>(())
/// ```
#[derive(Debug)]
pub struct CacheServiceBuilder {
    clock: Clock,
    namespace: String,
    default_ttl: Duration,
    local: Option<MemoryTier<String, String>>,
    distributed: Option<DynamicTier<String, String>>,
    policy: PromotionPolicy,
    limits: DistributedLimits,
    telemetry: TelemetryConfig,
}

impl CacheServiceBuilder {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_ttl: DEFAULT_TTL,
            local: None,
            distributed: None,
            policy: PromotionPolicy::default(),
            limits: DistributedLimits {
                call_timeout: DEFAULT_DISTRIBUTED_TIMEOUT,
                retry_interval: DEFAULT_RETRY_INTERVAL,
            },
            telemetry: TelemetryConfig::default(),
        }
    }

    /// Prepares a builder from deserialized configuration, creating the redis
    /// tier when the configuration asks for one.
    ///
    /// The redis connection is opened lazily, so an unreachable server is not
    /// an error here.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Configuration`] if the configuration fails
    /// [`CacheConfig::validate`], the redis URL cannot be parsed, or the crate
    /// was built without the `redis` feature.
    pub fn from_config(config: &CacheConfig, clock: Clock) -> Result<Self, Error> {
        config.validate()?;

        let mut local = MemoryTier::builder().name("trove-local");
        if let Some(capacity) = config.local_max_capacity {
            local = local.max_capacity(capacity);
        }

        let policy = if config.promote_distributed_hits {
            PromotionPolicy::Always
        } else {
            PromotionPolicy::Never
        };

        let mut builder = Self::new(clock)
            .namespace(config.namespace.clone())
            .default_ttl(config.default_ttl())
            .local(local.build())
            .promotion_policy(policy);

        if let Some(millis) = config.distributed_timeout_ms {
            builder = builder.distributed_timeout(Duration::from_millis(millis));
        }

        if let Some(millis) = config.distributed_retry_ms {
            builder = builder.distributed_retry_interval(Duration::from_millis(millis));
        }

        if config.use_distributed_tier {
            builder.distributed = Some(redis_tier(config)?);
        }

        Ok(builder)
    }

    /// Sets the first segment of every key.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the TTL used when a caller passes `None`.
    #[must_use]
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Uses `tier` as the local tier.
    #[must_use]
    pub fn local(mut self, tier: MemoryTier<String, String>) -> Self {
        self.local = Some(tier);
        self
    }

    /// Uses `tier` as the distributed tier.
    #[must_use]
    pub fn distributed<T>(mut self, tier: T) -> Self
    where
        T: CacheTier<String, String> + 'static,
    {
        self.distributed = Some(tier.into_dynamic());
        self
    }

    /// Sets whether distributed hits are copied into the local tier.
    #[must_use]
    pub fn promotion_policy(mut self, policy: PromotionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bounds every distributed call. A call that takes longer counts as a
    /// failure and is abandoned. Defaults to 3 seconds.
    #[must_use]
    pub fn distributed_timeout(mut self, timeout: Duration) -> Self {
        self.limits.call_timeout = timeout;
        self
    }

    /// How long to stop calling the distributed tier after it fails. Defaults
    /// to 10 seconds.
    ///
    /// Once the interval passes, one call is let through to test the tier. The
    /// reachability check in [`statistics`](CacheService::statistics) always
    /// calls through.
    #[must_use]
    pub fn distributed_retry_interval(mut self, interval: Duration) -> Self {
        self.limits.retry_interval = interval;
        self
    }

    /// Enables per-operation logs or metrics.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Builds the service.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidKey`] for a blank namespace and
    /// [`ErrorKind::Configuration`] for a zero default TTL.
    pub fn build(self) -> Result<CacheService, Error> {
        let keys = KeyBuilder::new(self.namespace)?;

        if self.default_ttl.is_zero() {
            return Err(Error::caused_by(ErrorKind::Configuration, "default TTL must be greater than zero"));
        }

        let telemetry = self.telemetry.build();
        let local = TierWrapper::new(
            LOCAL_TIER_NAME,
            self.local.unwrap_or_default(),
            self.clock.clone(),
            telemetry.clone(),
        );
        let distributed = self
            .distributed
            .map(|tier| TierWrapper::new(DISTRIBUTED_TIER_NAME, tier, self.clock.clone(), telemetry.clone()));

        let tiers = Tiers::new(local, distributed, self.policy, self.default_ttl, self.limits, self.clock.clone());
        Ok(CacheService::from_parts(keys, tiers, self.clock, telemetry, self.default_ttl))
    }
}

#[cfg(feature = "redis")]
fn redis_tier(config: &CacheConfig) -> Result<DynamicTier<String, String>, Error> {
    let url = config.redis_url.as_deref().unwrap_or_default();
    let mut builder = trove_redis::RedisTier::builder(url);

    if let Some(prefix) = &config.redis_key_prefix {
        builder = builder.key_prefix(prefix.clone());
    }

    if let Some(millis) = config.connect_timeout_ms {
        builder = builder.connect_timeout(Duration::from_millis(millis));
    }

    if let Some(millis) = config.response_timeout_ms {
        builder = builder.response_timeout(Duration::from_millis(millis));
    }

    builder
        .build()
        .map(DynamicTierExt::into_dynamic)
        .map_err(|e| Error::caused_by(ErrorKind::Configuration, e))
}

#[cfg(not(feature = "redis"))]
fn redis_tier(_config: &CacheConfig) -> Result<DynamicTier<String, String>, Error> {
    Err(Error::caused_by(
        ErrorKind::Configuration,
        "use_distributed_tier requires the `redis` feature",
    ))
}
