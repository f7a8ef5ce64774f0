// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Local-then-distributed composition with degradation.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tick::{Clock, FutureExt};
use trove_memory::MemoryTier;
use trove_tier::{CacheEntry, CacheTier, DynamicTier, Error};

use crate::{
    telemetry::{CacheActivity, CacheOperation},
    wrapper::TierWrapper,
};

pub(crate) type LocalTier = TierWrapper<String, String, MemoryTier<String, String>>;
pub(crate) type DistributedTier = TierWrapper<String, String, DynamicTier<String, String>>;

/// Whether a distributed hit is copied into the local tier.
///
/// Promoted entries keep the remaining lifetime the distributed tier reports, or
/// the service's default TTL when it reports none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum PromotionPolicy {
    /// Copy every distributed hit into the local tier.
    #[default]
    Always,
    /// Leave the local tier untouched on distributed hits.
    Never,
}

/// Bounds on talking to the distributed tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DistributedLimits {
    /// Longest a single distributed call may take before it counts as a failure.
    pub call_timeout: Duration,
    /// How long the distributed tier is skipped after a failure.
    pub retry_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Health {
    Up,
    Down { retry_at: Instant },
}

/// The two tiers and the rules for combining them.
///
/// Nothing here returns an error: a failing local tier is logged at ERROR, a
/// failing distributed tier at WARN, and the operation carries on with whatever
/// tier still works.
///
/// After a distributed failure the distributed tier is left alone until the
/// retry interval passes. The first call after that goes through as a trial;
/// success (or a successful reachability check) puts the tier back into service.
#[derive(Debug)]
pub(crate) struct Tiers {
    local: LocalTier,
    distributed: Option<DistributedTier>,
    policy: PromotionPolicy,
    default_ttl: Duration,
    limits: DistributedLimits,
    health: Mutex<Health>,
    clock: Clock,
}

impl Tiers {
    pub(crate) fn new(
        local: LocalTier,
        distributed: Option<DistributedTier>,
        policy: PromotionPolicy,
        default_ttl: Duration,
        limits: DistributedLimits,
        clock: Clock,
    ) -> Self {
        Self {
            local,
            distributed,
            policy,
            default_ttl,
            limits,
            health: Mutex::new(Health::Up),
            clock,
        }
    }

    pub(crate) async fn get(&self, key: &String) -> Option<CacheEntry<String>> {
        match self.local.get(key).await {
            Ok(Some(entry)) => return Some(entry),
            Ok(None) => {}
            Err(e) => tracing::error!(trove.tier = self.local.name(), trove.key = %key, error = %e, "local tier read failed"),
        }

        let distributed = self.distributed.as_ref()?;
        let entry = self.call(CacheOperation::Get, key, distributed.get(key)).await??;
        self.promote(key, &entry).await;
        Some(entry)
    }

    async fn promote(&self, key: &String, entry: &CacheEntry<String>) {
        if self.policy == PromotionPolicy::Never {
            return;
        }

        let ttl = entry.remaining_ttl(self.clock.system_time()).unwrap_or(self.default_ttl);
        if ttl.is_zero() {
            return;
        }

        match self.local.insert(key, CacheEntry::with_ttl(entry.value().clone(), ttl)).await {
            Ok(()) => self.local.record(CacheOperation::Insert, CacheActivity::Promoted, None),
            Err(e) => tracing::error!(trove.tier = self.local.name(), trove.key = %key, error = %e, "local tier promotion failed"),
        }
    }

    /// Writes the distributed tier first, then the local tier.
    pub(crate) async fn insert(&self, key: &String, entry: CacheEntry<String>) {
        if let Some(distributed) = &self.distributed {
            self.call(CacheOperation::Insert, key, distributed.insert(key, entry.clone())).await;
        }

        if let Err(e) = self.local.insert(key, entry).await {
            tracing::error!(trove.tier = self.local.name(), trove.key = %key, error = %e, "local tier write failed");
        }
    }

    pub(crate) async fn invalidate(&self, key: &String) {
        let local = self.local.invalidate(key);
        let distributed = async {
            if let Some(distributed) = &self.distributed {
                self.call(CacheOperation::Invalidate, key, distributed.invalidate(key)).await;
            }
        };

        let (local, ()) = futures::join!(local, distributed);

        if let Err(e) = local {
            tracing::error!(trove.tier = self.local.name(), trove.key = %key, error = %e, "local tier remove failed");
        }
    }

    /// Checks the distributed tier, then the local tier.
    pub(crate) async fn exists(&self, key: &String) -> bool {
        if let Some(distributed) = &self.distributed
            && let Some(Some(_)) = self.call(CacheOperation::Get, key, distributed.get(key)).await
        {
            return true;
        }

        match self.local.get(key).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::error!(trove.tier = self.local.name(), trove.key = %key, error = %e, "local tier read failed");
                false
            }
        }
    }

    /// Wipes the local tier, and the distributed tier if it supports clearing.
    pub(crate) async fn clear(&self) {
        if let Err(e) = self.local.clear().await {
            tracing::error!(trove.tier = self.local.name(), error = %e, "local tier clear failed");
        }

        let Some(distributed) = &self.distributed else {
            return;
        };

        if !self.admit() {
            tracing::warn!(trove.tier = distributed.name(), "distributed tier was not cleared while unavailable");
            return;
        }

        match distributed.clear().timeout(&self.clock, self.limits.call_timeout).await {
            Ok(Ok(())) => self.mark_available(),
            Ok(Err(e)) => tracing::warn!(trove.tier = distributed.name(), error = %e, "distributed tier was not cleared"),
            Err(e) => self.degrade(CacheOperation::Clear, "*", &Error::from_message(e)),
        }
    }

    /// Round-trips to the distributed tier and records whether it answered.
    pub(crate) async fn check_reachable(&self) -> bool {
        let Some(distributed) = &self.distributed else {
            return false;
        };

        let reachable = matches!(distributed.ping().timeout(&self.clock, self.limits.call_timeout).await, Ok(Ok(())));
        if reachable {
            self.mark_available();
        } else {
            self.mark_down();
        }
        reachable
    }

    /// Keys resident in the local tier after applying pending evictions.
    pub(crate) async fn resident(&self) -> u64 {
        self.local.inner().run_pending_tasks().await;
        self.local.len().unwrap_or_default()
    }

    pub(crate) fn distributed_configured(&self) -> bool {
        self.distributed.is_some()
    }

    pub(crate) fn distributed_available(&self) -> bool {
        self.distributed.is_some() && *self.health.lock() == Health::Up
    }

    /// Runs a distributed call unless the tier is resting after a failure.
    ///
    /// Returns `None` when the call was skipped, failed or timed out.
    async fn call<T>(&self, operation: CacheOperation, key: &str, call: impl Future<Output = Result<T, Error>>) -> Option<T> {
        if !self.admit() {
            return None;
        }

        match call.timeout(&self.clock, self.limits.call_timeout).await {
            Ok(Ok(value)) => {
                self.mark_available();
                Some(value)
            }
            Ok(Err(e)) => {
                self.degrade(operation, key, &e);
                None
            }
            Err(e) => {
                self.degrade(operation, key, &Error::from_message(e));
                None
            }
        }
    }

    /// Whether a distributed call may go out now.
    ///
    /// Once the retry interval has passed, one caller is let through and the
    /// interval restarts, so a dead tier sees one trial per interval.
    fn admit(&self) -> bool {
        let mut health = self.health.lock();
        match *health {
            Health::Up => true,
            Health::Down { retry_at } => {
                let now = self.clock.instant();
                if now < retry_at {
                    return false;
                }
                *health = Health::Down {
                    retry_at: self.retry_after(now),
                };
                true
            }
        }
    }

    fn retry_after(&self, now: Instant) -> Instant {
        now.checked_add(self.limits.retry_interval).unwrap_or(now)
    }

    fn mark_available(&self) {
        *self.health.lock() = Health::Up;
    }

    fn mark_down(&self) {
        let retry_at = self.retry_after(self.clock.instant());
        *self.health.lock() = Health::Down { retry_at };
    }

    fn degrade(&self, operation: CacheOperation, key: &str, error: &Error) {
        self.mark_down();
        tracing::warn!(
            trove.tier = "distributed",
            trove.operation = operation.as_str(),
            trove.key = %key,
            error = %error,
            "distributed tier unavailable, continuing with the local tier"
        );
    }
}
