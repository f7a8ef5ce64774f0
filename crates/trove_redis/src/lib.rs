// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Redis-backed distributed tier.
//!
//! [`RedisTier`] stores serialized payloads as plain redis strings and lets
//! redis enforce expiration (`SET ... PX`). Reads pipeline `GET` with `PTTL`
//! so callers know how long a value has left, which the cache uses when
//! copying distributed hits into its local tier.
//!
//! The connection is opened lazily on first use and shared by all clones.
//! If redis cannot be reached, operations fail with a tier
//! [`Error`](trove_tier::Error) and the next operation tries again.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use trove_redis::RedisTier;
//! use trove_tier::{CacheEntry, CacheTier};
//!
//! # async fn example() -> Result<(), trove_tier::Error> {
//! let tier = RedisTier::builder("redis://127.0.0.1:6379")
//!     .key_prefix("towntrek-cache:")
//!     .connect_timeout(Duration::from_secs(2))
//!     .build()?;
//!
//! let entry = CacheEntry::with_ttl("{\"views\":3}".to_string(), Duration::from_secs(300));
//! tier.insert(&"towntrek:client:42".to_string(), entry).await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod tier;

#[doc(inline)]
pub use builder::RedisTierBuilder;
#[doc(inline)]
pub use tier::RedisTier;
