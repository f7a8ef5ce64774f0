// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Type-erased tier wrapper.

use std::{fmt::Debug, sync::Arc};

use crate::{CacheEntry, CacheTier, Error, tier::DynCacheTier};

/// Converts any [`CacheTier`] into a [`DynamicTier`].
///
/// # Examples
///
/// ```
/// use trove_tier::{CacheTier, DynamicTier, DynamicTierExt};
///
/// fn erase<T>(tier: T) -> DynamicTier<String, String>
/// where
///     T: CacheTier<String, String> + 'static,
/// {
///     tier.into_dynamic()
/// }
/// ```
pub trait DynamicTierExt<K, V>: Sized {
    /// Boxes this tier behind a clonable trait object.
    fn into_dynamic(self) -> DynamicTier<K, V>;
}

impl<K, V, T> DynamicTierExt<K, V> for T
where
    T: CacheTier<K, V> + 'static,
{
    fn into_dynamic(self) -> DynamicTier<K, V> {
        DynamicTier::new(self)
    }
}

/// A clonable tier with its concrete storage type erased.
pub struct DynamicTier<K, V>(Arc<DynCacheTier<'static, K, V>>);

impl<K, V> DynamicTier<K, V> {
    pub(crate) fn new<T>(tier: T) -> Self
    where
        T: CacheTier<K, V> + Send + Sync + 'static,
    {
        Self(DynCacheTier::new_arc(tier))
    }
}

impl<K, V> Debug for DynamicTier<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicTier").finish_non_exhaustive()
    }
}

impl<K, V> Clone for DynamicTier<K, V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K, V> CacheTier<K, V> for DynamicTier<K, V>
where
    K: Sync,
    V: Send,
{
    async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        self.0.get(key).await
    }

    async fn insert(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
        self.0.insert(key, entry).await
    }

    async fn invalidate(&self, key: &K) -> Result<(), Error> {
        self.0.invalidate(key).await
    }

    async fn clear(&self) -> Result<(), Error> {
        self.0.clear().await
    }

    async fn ping(&self) -> Result<(), Error> {
        self.0.ping().await
    }

    fn len(&self) -> Option<u64> {
        self.0.len()
    }

    fn is_empty(&self) -> Option<bool> {
        self.0.is_empty()
    }
}
