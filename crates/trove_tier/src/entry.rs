// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    ops::Deref,
    time::{Duration, SystemTime},
};

/// A stored value with its expiration metadata.
///
/// The absolute expiration is `cached_at + ttl`. Both halves are optional:
/// an entry missing either one never expires by clock. Tiers that enforce
/// expiration natively (redis) hand back entries whose `ttl` is the remaining
/// lifetime and whose `cached_at` is stamped by the reader.
///
/// # Examples
///
/// ```
/// use trove_tier::CacheEntry;
/// use std::time::{Duration, SystemTime};
///
/// let now = SystemTime::UNIX_EPOCH;
/// let mut entry = CacheEntry::with_ttl("payload".to_string(), Duration::from_secs(60));
/// entry.set_cached_at(now);
///
/// assert!(!entry.is_expired(now + Duration::from_secs(59)));
/// assert!(entry.is_expired(now + Duration::from_secs(60)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry<V> {
    value: V,
    cached_at: Option<SystemTime>,
    ttl: Option<Duration>,
}

impl<V> CacheEntry<V> {
    /// Creates an entry with no expiration metadata.
    pub fn new(value: V) -> Self {
        Self {
            value,
            cached_at: None,
            ttl: None,
        }
    }

    /// Creates an entry that lives for `ttl` once stamped with a `cached_at` time.
    pub fn with_ttl(value: V, ttl: Duration) -> Self {
        Self {
            value,
            cached_at: None,
            ttl: Some(ttl),
        }
    }

    /// Returns when this entry was written, if stamped.
    #[must_use]
    pub fn cached_at(&self) -> Option<SystemTime> {
        self.cached_at
    }

    /// Stamps the time this entry was written.
    pub fn set_cached_at(&mut self, cached_at: SystemTime) {
        self.cached_at = Some(cached_at);
    }

    /// Stamps `cached_at` only if the entry has no timestamp yet.
    pub fn ensure_cached_at(&mut self, now: SystemTime) {
        if self.cached_at.is_none() {
            self.cached_at = Some(now);
        }
    }

    /// Returns the time-to-live, if set.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Sets the time-to-live.
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = Some(ttl);
    }

    /// Returns the absolute expiration instant, if both halves are known.
    #[must_use]
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.cached_at?.checked_add(self.ttl?)
    }

    /// Returns `true` once `now` has reached the absolute expiration.
    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at().is_some_and(|expires_at| now >= expires_at)
    }

    /// Returns how long the entry has left to live at `now`.
    ///
    /// `None` means the entry has no clock-based expiration; `Some(Duration::ZERO)`
    /// means it has already expired.
    #[must_use]
    pub fn remaining_ttl(&self, now: SystemTime) -> Option<Duration> {
        self.expires_at()
            .map(|expires_at| expires_at.duration_since(now).unwrap_or(Duration::ZERO))
    }

    /// Consumes the entry and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns a reference to the stored value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<V> Deref for CacheEntry<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<V> From<V> for CacheEntry<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}
