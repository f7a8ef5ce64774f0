// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Per-key async mutual exclusion.
//!
//! [`KeyLatch`] hands out at most one [`LatchGuard`] per key at a time. Callers
//! for different keys never wait on each other. Callers for the same key queue
//! in FIFO order and each gets the guard in turn once the previous holder drops
//! it.
//!
//! This is the building block for stampede protection: the first caller for a
//! key runs the expensive work while holding the guard, and everyone queued
//! behind it re-checks the cache once they get in. Unlike coalescing the result
//! itself, every waiter observes the leader's outcome through the cache, so a
//! failed leader simply lets the next waiter try.
//!
//! Entries for a key live only while someone holds or waits for that key. When
//! the last guard drops, the entry is removed.
//!
//! # Example
//!
//! ```
//! use keylatch::KeyLatch;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let latch = KeyLatch::new();
//!
//! {
//!     let _guard = latch.acquire("report:42".to_string()).await;
//!     assert_eq!(latch.in_flight(), 1);
//!     // compute and store the value
//! }
//!
//! assert_eq!(latch.in_flight(), 0);
//! # });
//! ```
//!
//! # Cancellation
//!
//! Dropping an `acquire` future before it completes leaves the queue without
//! side effects. Dropping a guard mid-work (for example when the holding task is
//! aborted) releases the key to the next waiter.

use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    sync::{Arc, Weak},
};

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;
type SharedMapping<K> = Arc<SyncMutex<HashMap<K, Weak<AsyncMutex<()>>>>>;

/// A set of independent async locks, one per key, created on demand.
///
/// Clones share the same set of locks.
pub struct KeyLatch<K> {
    mapping: SharedMapping<K>,
}

impl<K> Default for KeyLatch<K> {
    fn default() -> Self {
        Self {
            mapping: Arc::default(),
        }
    }
}

impl<K> Clone for KeyLatch<K> {
    fn clone(&self) -> Self {
        Self {
            mapping: Arc::clone(&self.mapping),
        }
    }
}

impl<K> fmt::Debug for KeyLatch<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyLatch")
            .field("keys", &self.mapping.lock().len())
            .finish()
    }
}

impl<K> KeyLatch<K>
where
    K: Hash + Eq + Clone,
{
    /// Creates an empty latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no one else holds `key`, then returns a guard for it.
    pub async fn acquire(&self, key: K) -> LatchGuard<K> {
        let slot = self.slot_for(&key);
        let permit = Arc::clone(&slot).lock_owned().await;

        LatchGuard {
            permit: Some(permit),
            slot: Some(slot),
            key,
            mapping: Arc::clone(&self.mapping),
        }
    }

    /// Returns a guard for `key` only if it is free right now.
    pub fn try_acquire(&self, key: K) -> Option<LatchGuard<K>> {
        let slot = self.slot_for(&key);
        let Ok(permit) = Arc::clone(&slot).try_lock_owned() else {
            release_slot(&self.mapping, slot);
            return None;
        };

        Some(LatchGuard {
            permit: Some(permit),
            slot: Some(slot),
            key,
            mapping: Arc::clone(&self.mapping),
        })
    }

    /// Number of keys currently held or waited on.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.mapping.lock().values().filter(|slot| slot.strong_count() > 0).count()
    }

    fn slot_for(&self, key: &K) -> Slot {
        let mut mapping = self.mapping.lock();
        if let Some(slot) = mapping.get(key).and_then(Weak::upgrade) {
            return slot;
        }

        // Either absent or left behind by a holder that is still tearing down.
        let slot = Arc::new(AsyncMutex::new(()));
        mapping.insert(key.clone(), Arc::downgrade(&slot));
        slot
    }
}

/// Exclusive access to one key of a [`KeyLatch`].
///
/// The key is released when the guard drops.
pub struct LatchGuard<K>
where
    K: Hash + Eq,
{
    permit: Option<OwnedMutexGuard<()>>,
    slot: Option<Slot>,
    key: K,
    mapping: SharedMapping<K>,
}

impl<K> LatchGuard<K>
where
    K: Hash + Eq,
{
    /// The key this guard holds.
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K> fmt::Debug for LatchGuard<K>
where
    K: Hash + Eq + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatchGuard").field("key", &self.key).finish_non_exhaustive()
    }
}

impl<K> Drop for LatchGuard<K>
where
    K: Hash + Eq,
{
    fn drop(&mut self) {
        // Unlock before touching the map so a queued waiter can proceed.
        drop(self.permit.take());
        if let Some(slot) = self.slot.take() {
            release_slot(&self.mapping, slot);
        }
    }
}

/// Drops `slot` and forgets every key nobody holds or waits on anymore.
///
/// Sweeping all dead keys, not just `key`, also collects the ones left behind
/// by cancelled `acquire` futures.
fn release_slot<K>(mapping: &SharedMapping<K>, slot: Slot)
where
    K: Hash + Eq,
{
    let mut mapping = mapping.lock();
    drop(slot);
    mapping.retain(|_, weak| weak.strong_count() > 0);
}
