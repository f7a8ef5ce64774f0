// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::SystemTime,
};

use serde::Serialize;

/// A snapshot of the service's process-lifetime counters.
///
/// Returned by [`CacheService::statistics`](crate::CacheService::statistics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct CacheStatistics {
    /// Lookups answered from either tier.
    pub hits: u64,
    /// Lookups answered by neither tier, including unreadable payloads.
    pub misses: u64,
    /// Keys resident in the local tier.
    pub resident_keys: u64,
    /// Whether a distributed tier is configured at all.
    pub distributed_configured: bool,
    /// Whether the distributed tier answered the most recent reachability check.
    pub distributed_available: bool,
    /// When this snapshot was taken.
    pub last_updated: SystemTime,
}

impl CacheStatistics {
    /// Total lookups recorded.
    #[must_use]
    pub fn lookups(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }

    /// Fraction of lookups that hit, or `0.0` before the first lookup.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "ratio only needs approximate precision")]
    pub fn hit_ratio(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }
}

/// Lock-free hit and miss counters.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub(crate) fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
