// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Local tier implementation using moka.

use std::{
    hash::Hash,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use moka::{Expiry, future::Cache};
use trove_tier::{CacheEntry, CacheTier, Error};

use crate::builder::MemoryTierBuilder;

/// Expires each entry after its own TTL, if it carries one.
struct EntryExpiry;

impl<K, V> Expiry<K, CacheEntry<V>> for EntryExpiry {
    fn expire_after_create(&self, _key: &K, value: &CacheEntry<V>, _created_at: Instant) -> Option<Duration> {
        value.ttl()
    }

    fn expire_after_update(
        &self,
        _key: &K,
        value: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl()
    }
}

/// A bounded, concurrent, in-process tier.
///
/// Clones share the same storage.
///
/// `len` reports an exact resident count maintained alongside moka: it is
/// incremented on every write and decremented whenever moka reports a removal
/// (replacement, invalidation, expiry, or capacity eviction). Removals that moka
/// processes lazily show up after its next maintenance pass; call
/// [`run_pending_tasks`](Self::run_pending_tasks) to force one.
///
/// # Examples
///
/// ```
/// use trove_memory::MemoryTier;
/// use trove_tier::{CacheEntry, CacheTier};
///
/// # futures::executor::block_on(async {
/// let tier = MemoryTier::<String, u32>::new();
/// tier.insert(&"k".to_string(), CacheEntry::new(1)).await.unwrap();
/// tier.invalidate(&"k".to_string()).await.unwrap();
/// assert!(tier.get(&"k".to_string()).await.unwrap().is_none());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MemoryTier<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, CacheEntry<V>>,
    resident: Arc<AtomicU64>,
}

impl<K, V> Default for MemoryTier<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoryTier<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an unbounded tier.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a tier holding at most `max_capacity` entries.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> MemoryTierBuilder<K, V> {
        MemoryTierBuilder::new()
    }

    /// Applies moka's pending evictions and expirations now.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    pub(crate) fn from_builder(builder: &MemoryTierBuilder<K, V>) -> Self {
        let resident = Arc::new(AtomicU64::new(0));
        let on_removal = Arc::clone(&resident);

        let mut moka_builder = Cache::builder()
            .expire_after(EntryExpiry)
            .eviction_listener(move |_key, _value, _cause| {
                let _ = on_removal.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)));
            });

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(ttl) = builder.time_to_live {
            moka_builder = moka_builder.time_to_live(ttl);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: moka_builder.build(),
            resident,
        }
    }
}

impl<K, V> CacheTier<K, V> for MemoryTier<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        Ok(self.inner.get(key).await)
    }

    async fn insert(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
        self.resident.fetch_add(1, Ordering::AcqRel);
        self.inner.insert(key.clone(), entry).await;
        Ok(())
    }

    async fn invalidate(&self, key: &K) -> Result<(), Error> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.resident.load(Ordering::Acquire))
    }
}
