// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Bounded in-process cache tier backed by moka.
//!
//! [`MemoryTier`] is the local tier of the trove cache. It honors per-entry
//! TTLs carried by [`CacheEntry`](trove_tier::CacheEntry), evicts with moka's
//! `TinyLFU` policy once the capacity is reached, and keeps an exact count of
//! resident entries for statistics.
//!
//! # Quick Start
//!
//! ```
//! use trove_memory::MemoryTierBuilder;
//! use trove_tier::{CacheEntry, CacheTier};
//! use std::time::Duration;
//!
//! # futures::executor::block_on(async {
//! let tier = MemoryTierBuilder::<String, String>::new()
//!     .max_capacity(1000)
//!     .name("local")
//!     .build();
//!
//! let entry = CacheEntry::with_ttl("payload".to_string(), Duration::from_secs(300));
//! tier.insert(&"key".to_string(), entry).await.unwrap();
//!
//! let found = tier.get(&"key".to_string()).await.unwrap();
//! assert_eq!(found.unwrap().value(), "payload");
//! assert_eq!(tier.len(), Some(1));
//! # });
//! ```

pub mod builder;
pub mod tier;

#[doc(inline)]
pub use builder::MemoryTierBuilder;
#[doc(inline)]
pub use tier::MemoryTier;
