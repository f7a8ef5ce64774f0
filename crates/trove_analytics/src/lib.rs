// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Analytics memoization on top of the trove cache.
//!
//! [`AnalyticsCache`] sits between analytics consumers and the expensive
//! aggregation queries behind an [`AnalyticsSource`]. It decides what each
//! request is cached under ([`AnalyticsKey`]), how long it stays fresh
//! ([`AnalyticsTtls`]), and which keys to drop when a user's data changes.
//!
//! | Request | Logical key | Default TTL |
//! |---|---|---|
//! | Client overview | `client:{user_id}` | 5 minutes |
//! | Business totals | `business:{business_id}:{user_id}` | 5 minutes |
//! | Views chart | `viewschart:{user_id}:{days}:{platform}` | 5 minutes |
//! | Reviews chart | `reviewschart:{user_id}:{days}` | 5 minutes |
//! | Competitor insights | `competitors:{user_id}` | 30 minutes |
//! | Category benchmarks | `benchmarks:{category}:{user_id}` | 30 minutes |
//!
//! The distributed tier cannot delete by pattern, so bulk invalidation relies
//! on a per-user index of the keys this process issued. Keys issued elsewhere
//! expire on their own.

mod index;
mod keys;
mod model;
mod policy;
mod source;

#[doc(inline)]
pub use keys::{AnalyticsKey, AnalyticsTtls, TtlClass};
#[doc(inline)]
pub use model::{
    BusinessAnalytics, CategoryBenchmarks, ClientAnalytics, Competitor, CompetitorInsights, DailyCount, Platform, ReviewsChart,
    UnknownPlatform, ViewsChart,
};
#[doc(inline)]
pub use policy::AnalyticsCache;
#[doc(inline)]
pub use source::AnalyticsSource;
