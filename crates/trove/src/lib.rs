// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A typed two-tier cache with single-flight recomputation.
//!
//! [`CacheService`] stores serializable values under type-qualified keys in an
//! in-process [`MemoryTier`] and, optionally, a distributed tier such as
//! redis. Reads try the local tier first; writes go to both.
//!
//! # Guarantees
//!
//! - **Type-qualified keys**: a logical key is stored as
//!   `{namespace}:{type_tag}:{logical}`, so two types never share an entry.
//! - **Single flight**: concurrent [`get_or_set`](CacheService::get_or_set)
//!   calls that miss on the same key run the factory once; unrelated keys never
//!   wait on each other.
//! - **No cached failures**: a failing factory stores nothing.
//! - **Degradation**: a failing distributed tier is logged at WARN and left
//!   alone for a retry interval, and every distributed call is bounded by a
//!   timeout. No tier failure ever reaches the caller.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use tick::Clock;
//! use trove::CacheService;
//!
//! # futures::executor::block_on(async {
//! let cache = CacheService::builder(Clock::new_frozen()).build()?;
//!
//! let views = cache
//!     .get_or_set("views:42", Some(Duration::from_secs(300)), || async {
//!         // An expensive aggregation would run here.
//!         Ok::<_, std::io::Error>(vec![3_u64, 5, 8])
//!     })
//!     .await?;
//! assert_eq!(views, vec![3, 5, 8]);
//!
//! let stats = cache.statistics().await;
//! assert_eq!((stats.hits, stats.misses), (0, 1));
//! # Ok::<(), trove::Error>(())
//! # }).unwrap();
//! ```
//!
//! # Features
//!
//! - `redis` (default): [`CacheService::from_config`] can create a redis tier.
//! - `metrics`: OpenTelemetry instruments via [`TelemetryConfig::with_metrics`].
//! - `test-util`: the [`testing`] module with a failure-injecting mock tier
//!   and a log capture helper.

mod builder;
mod config;
mod error;
mod key;
pub mod serializer;
mod service;
mod stats;
mod telemetry;
#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod testing;
mod tiers;
mod wrapper;

#[doc(inline)]
pub use builder::CacheServiceBuilder;
#[doc(inline)]
pub use config::CacheConfig;
#[doc(inline)]
pub use error::{Error, ErrorKind};
#[doc(inline)]
pub use key::{CacheKey, CacheValue, KeyBuilder};
#[doc(inline)]
pub use service::CacheService;
#[doc(inline)]
pub use stats::CacheStatistics;
#[doc(inline)]
pub use telemetry::TelemetryConfig;
#[doc(inline)]
pub use tiers::PromotionPolicy;
#[doc(inline)]
pub use trove_memory::MemoryTier;
#[cfg(feature = "redis")]
#[doc(inline)]
pub use trove_redis::RedisTier;
#[doc(inline)]
pub use trove_tier::{CacheEntry, CacheTier, DynamicTier, DynamicTierExt, Error as TierError};
