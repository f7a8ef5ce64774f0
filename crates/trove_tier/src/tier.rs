// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for cache storage backends.

use crate::{CacheEntry, Error};

/// A key/value store the cache can read from and write to.
///
/// Implementations report I/O problems through [`Error`] and never panic for them;
/// the caller decides whether a failure is fatal. For the two tiers composed by the
/// cache service it never is: failures degrade to a miss or a no-op.
///
/// The four storage methods are required. `ping`, `len` and `is_empty` have
/// defaults:
/// - `ping`: succeeds (in-process tiers are always reachable)
/// - `len`: returns `None` (not every tier tracks residency)
/// - `is_empty`: delegates to `len`
#[cfg_attr(
    any(test, feature = "dynamic-tier"),
    dynosaur::dynosaur(pub(crate) DynCacheTier = dyn(box) CacheTier, bridge(none))
)]
pub trait CacheTier<K, V>: Send + Sync {
    /// Fetches the entry stored under `key`.
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<CacheEntry<V>>, Error>> + Send;

    /// Stores `entry` under `key`, replacing any previous entry.
    fn insert(&self, key: &K, entry: CacheEntry<V>) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes the entry stored under `key`. Removing a missing key succeeds.
    fn invalidate(&self, key: &K) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes every entry owned by this tier.
    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Performs a lightweight round-trip to check that the tier is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), Error>> + Send {
        std::future::ready(Ok(()))
    }

    /// Returns the number of resident entries, if tracked.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the tier holds no entries.
    ///
    /// Returns `None` for implementations that don't track size.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }
}
