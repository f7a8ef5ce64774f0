// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Decorates a tier with telemetry and clock-driven expiry.

use std::{hash::Hash, marker::PhantomData, time::Duration};

use tick::Clock;
use trove_tier::{CacheEntry, CacheTier, Error};

use crate::telemetry::{CacheActivity, CacheOperation, CacheTelemetry, TierName, ext::ClockExt};

/// Wraps a tier so that every call is timed and recorded, and entries are
/// checked against the service clock on the way out.
///
/// Entries are stamped with `cached_at` on insert. Entries read back without a
/// stamp (redis reports a remaining TTL instead) are stamped at read time. An
/// entry past its TTL by the service clock is reported as a miss even if the
/// backing store has not evicted it yet.
#[derive(Debug)]
pub(crate) struct TierWrapper<K, V, S> {
    name: TierName,
    inner: S,
    clock: Clock,
    telemetry: CacheTelemetry,
    _phantom: PhantomData<fn(K, V)>,
}

impl<K, V, S> TierWrapper<K, V, S> {
    pub(crate) fn new(name: TierName, inner: S, clock: Clock, telemetry: CacheTelemetry) -> Self {
        Self {
            name,
            inner,
            clock,
            telemetry,
            _phantom: PhantomData,
        }
    }

    pub(crate) fn name(&self) -> TierName {
        self.name
    }

    pub(crate) fn inner(&self) -> &S {
        &self.inner
    }

    pub(crate) fn record(&self, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        self.telemetry.record(self.name, operation, activity, duration);
    }
}

impl<K, V, S> TierWrapper<K, V, S>
where
    S: CacheTier<K, V>,
{
    fn record_outcome(&self, operation: CacheOperation, ok: CacheActivity, result: &Result<(), Error>, duration: Duration) {
        match result {
            Ok(()) => {
                self.record(operation, ok, Some(duration));
                if let Some(size) = self.inner.len() {
                    self.telemetry.record_size(self.name, size);
                }
            }
            Err(_) => self.record(operation, CacheActivity::Error, Some(duration)),
        }
    }
}

impl<K, V, S> CacheTier<K, V> for TierWrapper<K, V, S>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
    S: CacheTier<K, V>,
{
    async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        let timed = self.clock.measure(self.inner.get(key)).await;
        let now = self.clock.system_time();

        match timed.value {
            Ok(Some(mut entry)) => {
                entry.ensure_cached_at(now);
                if entry.is_expired(now) {
                    self.record(CacheOperation::Get, CacheActivity::Expired, Some(timed.elapsed));
                    Ok(None)
                } else {
                    self.record(CacheOperation::Get, CacheActivity::Hit, Some(timed.elapsed));
                    Ok(Some(entry))
                }
            }
            Ok(None) => {
                self.record(CacheOperation::Get, CacheActivity::Miss, Some(timed.elapsed));
                Ok(None)
            }
            Err(e) => {
                self.record(CacheOperation::Get, CacheActivity::Error, Some(timed.elapsed));
                Err(e)
            }
        }
    }

    async fn insert(&self, key: &K, mut entry: CacheEntry<V>) -> Result<(), Error> {
        entry.ensure_cached_at(self.clock.system_time());
        let timed = self.clock.measure(self.inner.insert(key, entry)).await;
        self.record_outcome(CacheOperation::Insert, CacheActivity::Inserted, &timed.value, timed.elapsed);
        timed.value
    }

    async fn invalidate(&self, key: &K) -> Result<(), Error> {
        let timed = self.clock.measure(self.inner.invalidate(key)).await;
        self.record_outcome(CacheOperation::Invalidate, CacheActivity::Invalidated, &timed.value, timed.elapsed);
        timed.value
    }

    async fn clear(&self) -> Result<(), Error> {
        let timed = self.clock.measure(self.inner.clear()).await;
        self.record_outcome(CacheOperation::Clear, CacheActivity::Ok, &timed.value, timed.elapsed);
        timed.value
    }

    async fn ping(&self) -> Result<(), Error> {
        let timed = self.clock.measure(self.inner.ping()).await;
        let activity = if timed.value.is_ok() { CacheActivity::Ok } else { CacheActivity::Error };
        self.record(CacheOperation::Ping, activity, Some(timed.elapsed));
        timed.value
    }

    fn len(&self) -> Option<u64> {
        self.inner.len()
    }
}
