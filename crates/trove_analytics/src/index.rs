// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Secondary index from user to the keys issued on their behalf.

use std::{
    collections::{HashMap, hash_map::Entry},
    time::SystemTime,
};

use parking_lot::Mutex;
use trove::CacheKey;

const SWEEP_EVERY: usize = 1024;

/// Tracks which cache keys were issued for which user, with their expiry.
///
/// The index only knows keys issued through this process. Records past their
/// expiry are pruned whenever their owner gets a new record, and every owner
/// is swept once per `sweep_every` records.
#[derive(Debug)]
pub(crate) struct OwnerIndex {
    state: Mutex<State>,
    sweep_every: usize,
}

#[derive(Debug, Default)]
struct State {
    owners: HashMap<String, HashMap<CacheKey, SystemTime>>,
    since_sweep: usize,
}

impl State {
    fn sweep(&mut self, now: SystemTime) {
        self.since_sweep = 0;
        self.owners.retain(|_, keys| {
            keys.retain(|_, expiry| *expiry > now);
            !keys.is_empty()
        });
    }
}

impl Default for OwnerIndex {
    fn default() -> Self {
        Self::with_sweep_every(SWEEP_EVERY)
    }
}

impl OwnerIndex {
    pub(crate) fn with_sweep_every(sweep_every: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            sweep_every: sweep_every.max(1),
        }
    }

    /// Records that `key` was issued for `owner` and stays fresh until `expires_at`.
    pub(crate) fn record(&self, owner: &str, key: CacheKey, expires_at: SystemTime, now: SystemTime) {
        let mut state = self.state.lock();

        let keys = state.owners.entry(owner.to_string()).or_default();
        keys.retain(|_, expiry| *expiry > now);
        keys.insert(key, expires_at);

        state.since_sweep += 1;
        if state.since_sweep >= self.sweep_every {
            state.sweep(now);
        }
    }

    /// Removes and returns every live key recorded for `owner`.
    pub(crate) fn take(&self, owner: &str, now: SystemTime) -> Vec<CacheKey> {
        self.state
            .lock()
            .owners
            .remove(owner)
            .map(|keys| keys.into_iter().filter(|(_, expiry)| *expiry > now).map(|(key, _)| key).collect())
            .unwrap_or_default()
    }

    /// Drops a single record.
    pub(crate) fn forget(&self, owner: &str, key: &CacheKey) {
        let mut state = self.state.lock();
        if let Entry::Occupied(mut keys) = state.owners.entry(owner.to_string()) {
            keys.get_mut().remove(key);
            if keys.get().is_empty() {
                keys.remove();
            }
        }
    }

    /// Drops expired records and owners left without any.
    pub(crate) fn prune(&self, now: SystemTime) {
        self.state.lock().sweep(now);
    }

    /// Number of live records for `owner`.
    pub(crate) fn tracked(&self, owner: &str, now: SystemTime) -> usize {
        self.state
            .lock()
            .owners
            .get(owner)
            .map_or(0, |keys| keys.values().filter(|expiry| **expiry > now).count())
    }

    /// Number of owners with at least one record.
    #[cfg(test)]
    pub(crate) fn owners(&self) -> usize {
        self.state.lock().owners.len()
    }

    pub(crate) fn clear(&self) {
        *self.state.lock() = State::default();
    }
}
