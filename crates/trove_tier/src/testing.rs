// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory tier double for exercising degradation paths.
//!
//! [`MockTier`] keeps entries in a `HashMap`, records every call it receives and
//! fails on demand, so callers can assert how the layers above react to an
//! unreachable backing store.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use crate::{CacheEntry, CacheTier, Error};

/// A call received by a [`MockTier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOp<K, V> {
    /// `get` for the key.
    Get(K),
    /// `insert` of the entry under the key.
    Insert {
        /// Key written.
        key: K,
        /// Entry written.
        entry: CacheEntry<V>,
    },
    /// `invalidate` for the key.
    Invalidate(K),
    /// `clear`.
    Clear,
    /// `ping`.
    Ping,
}

impl<K, V> TierOp<K, V> {
    /// Returns the key this call targeted, if any.
    pub fn key(&self) -> Option<&K> {
        match self {
            Self::Get(key) | Self::Invalidate(key) | Self::Insert { key, .. } => Some(key),
            Self::Clear | Self::Ping => None,
        }
    }
}

type FailPredicate<K, V> = Box<dyn Fn(&TierOp<K, V>) -> bool + Send + Sync>;

/// A recording, failure-injecting tier.
///
/// Clones share storage, the call log and the failure predicate, so a test can
/// hand one clone to the cache and keep another for assertions.
///
/// # Examples
///
/// ```
/// use trove_tier::{CacheEntry, CacheTier, testing::{MockTier, TierOp}};
///
/// # futures::executor::block_on(async {
/// let tier = MockTier::<String, String>::new();
/// tier.insert(&"k".to_string(), CacheEntry::new("v".to_string())).await.unwrap();
///
/// tier.fail_when(|op| matches!(op, TierOp::Get(_)));
/// assert!(tier.get(&"k".to_string()).await.is_err());
///
/// tier.clear_failures();
/// assert!(tier.get(&"k".to_string()).await.unwrap().is_some());
/// # });
/// ```
pub struct MockTier<K, V> {
    data: Arc<Mutex<HashMap<K, CacheEntry<V>>>>,
    operations: Arc<Mutex<Vec<TierOp<K, V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<K, V>>>>,
}

impl<K, V> std::fmt::Debug for MockTier<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTier")
            .field("data", &self.data)
            .field("operations", &self.operations.lock().len())
            .field("failing", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl<K, V> Clone for MockTier<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<K, V> Default for MockTier<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockTier<K, V> {
    /// Creates an empty tier.
    #[must_use]
    pub fn new() -> Self {
        Self::from_map(HashMap::new())
    }

    fn from_map(data: HashMap<K, CacheEntry<V>>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Makes every call matching `predicate` fail with a tier error.
    ///
    /// Failing calls are still recorded. A later call replaces the predicate.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&TierOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Lets every call succeed again.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Forgets the recorded calls.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    fn should_fail(&self, op: &TierOp<K, V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }

    fn admit(&self, op: TierOp<K, V>, what: &'static str) -> Result<(), Error> {
        let fail = self.should_fail(&op);
        self.operations.lock().push(op);
        if fail {
            return Err(Error::from_message(format!("mock tier: {what} failed")));
        }
        Ok(())
    }
}

impl<K, V> MockTier<K, V>
where
    K: Eq + Hash,
{
    /// Creates a tier pre-populated with `data`.
    #[must_use]
    pub fn with_data(data: HashMap<K, CacheEntry<V>>) -> Self {
        Self::from_map(data)
    }

    /// Returns `true` if an entry is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.lock().contains_key(key)
    }
}

impl<K, V> MockTier<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Returns a copy of every recorded call, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<TierOp<K, V>> {
        self.operations.lock().clone()
    }
}

impl<K, V> MockTier<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Returns the stored entry under `key` without recording a call.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<CacheEntry<V>> {
        self.data.lock().get(key).cloned()
    }
}

impl<K, V> CacheTier<K, V> for MockTier<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        self.admit(TierOp::Get(key.clone()), "get")?;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn insert(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
        self.admit(
            TierOp::Insert {
                key: key.clone(),
                entry: entry.clone(),
            },
            "insert",
        )?;
        self.data.lock().insert(key.clone(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &K) -> Result<(), Error> {
        self.admit(TierOp::Invalidate(key.clone()), "invalidate")?;
        self.data.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.admit(TierOp::Clear, "clear")?;
        self.data.lock().clear();
        Ok(())
    }

    async fn ping(&self) -> Result<(), Error> {
        self.admit(TierOp::Ping, "ping")
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.lock().len() as u64)
    }
}
