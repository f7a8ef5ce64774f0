// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring the in-process tier.
//!
//! Keeps moka's own builder out of the public API.

use std::{hash::Hash, marker::PhantomData, time::Duration};

use crate::tier::MemoryTier;

/// Builder for a [`MemoryTier`].
///
/// # Examples
///
/// ```
/// use trove_memory::MemoryTier;
/// use std::time::Duration;
///
/// let tier = MemoryTier::<String, String>::builder()
///     .max_capacity(10_000)
///     .initial_capacity(256)
///     .time_to_live(Duration::from_secs(3600))
///     .name("local")
///     .build();
/// ```
#[derive(Debug)]
pub struct MemoryTierBuilder<K, V> {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) time_to_live: Option<Duration>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> Default for MemoryTierBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoryTierBuilder<K, V> {
    /// Creates a builder for an unbounded tier with no tier-wide expiration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_capacity: None,
            initial_capacity: None,
            time_to_live: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Caps the number of resident entries.
    ///
    /// Past the cap, entries are evicted under moka's `TinyLFU` policy.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Pre-allocation hint.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Upper bound on the lifetime of every entry.
    ///
    /// Applies on top of the per-entry TTL; whichever is shorter wins.
    #[must_use]
    pub fn time_to_live(mut self, duration: Duration) -> Self {
        self.time_to_live = Some(duration);
        self
    }

    /// Names the underlying moka cache.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the tier.
    #[must_use]
    pub fn build(self) -> MemoryTier<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        MemoryTier::from_builder(&self)
    }
}
