// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Logical key schema and freshness table.

use std::time::Duration;

use crate::Platform;

const SHORT_TTL: Duration = Duration::from_secs(5 * 60);
const MEDIUM_TTL: Duration = Duration::from_secs(30 * 60);

/// How long an analytics aggregate stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    /// Numbers owners watch change: overviews and charts.
    Short,
    /// Slow-moving comparisons: competitors and benchmarks.
    Medium,
}

/// One cacheable analytics request.
///
/// Every variant names the user it is issued on behalf of, which is what
/// [`AnalyticsCache::invalidate_user`](crate::AnalyticsCache::invalidate_user)
/// keys on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnalyticsKey {
    /// `client:{user_id}`
    Client {
        /// Owner.
        user_id: String,
    },
    /// `business:{business_id}:{user_id}`
    Business {
        /// Business.
        business_id: u64,
        /// Owner.
        user_id: String,
    },
    /// `viewschart:{user_id}:{days}:{platform}`
    ViewsChart {
        /// Owner.
        user_id: String,
        /// Trailing window.
        days: u32,
        /// Channel filter.
        platform: Platform,
    },
    /// `reviewschart:{user_id}:{days}`
    ReviewsChart {
        /// Owner.
        user_id: String,
        /// Trailing window.
        days: u32,
    },
    /// `competitors:{user_id}`
    Competitors {
        /// Owner.
        user_id: String,
    },
    /// `benchmarks:{category}:{user_id}`
    Benchmarks {
        /// Directory category.
        category: String,
        /// Owner.
        user_id: String,
    },
}

impl AnalyticsKey {
    /// The logical key passed to the cache service.
    ///
    /// # Examples
    ///
    /// ```
    /// use trove_analytics::{AnalyticsKey, Platform};
    ///
    /// let key = AnalyticsKey::ViewsChart {
    ///     user_id: "u-42".to_string(),
    ///     days: 30,
    ///     platform: Platform::Mobile,
    /// };
    /// assert_eq!(key.logical(), "viewschart:u-42:30:mobile");
    /// ```
    #[must_use]
    pub fn logical(&self) -> String {
        match self {
            Self::Client { user_id } => format!("client:{user_id}"),
            Self::Business { business_id, user_id } => format!("business:{business_id}:{user_id}"),
            Self::ViewsChart { user_id, days, platform } => format!("viewschart:{user_id}:{days}:{platform}"),
            Self::ReviewsChart { user_id, days } => format!("reviewschart:{user_id}:{days}"),
            Self::Competitors { user_id } => format!("competitors:{user_id}"),
            Self::Benchmarks { category, user_id } => format!("benchmarks:{category}:{user_id}"),
        }
    }

    /// The user this request is issued on behalf of.
    #[must_use]
    pub fn owner(&self) -> &str {
        match self {
            Self::Client { user_id }
            | Self::Business { user_id, .. }
            | Self::ViewsChart { user_id, .. }
            | Self::ReviewsChart { user_id, .. }
            | Self::Competitors { user_id }
            | Self::Benchmarks { user_id, .. } => user_id,
        }
    }

    /// The freshness class of this request.
    #[must_use]
    pub fn ttl_class(&self) -> TtlClass {
        match self {
            Self::Client { .. } | Self::Business { .. } | Self::ViewsChart { .. } | Self::ReviewsChart { .. } => TtlClass::Short,
            Self::Competitors { .. } | Self::Benchmarks { .. } => TtlClass::Medium,
        }
    }

    /// Describes why this key cannot be issued, if it cannot.
    ///
    /// Free-text segments must be non-blank and free of the `:` separator,
    /// otherwise two different requests could share one key.
    pub(crate) fn defect(&self) -> Option<&'static str> {
        if let Some(defect) = segment_defect(self.owner(), "user id must not be empty", "user id must not contain ':'") {
            return Some(defect);
        }

        match self {
            Self::Benchmarks { category, .. } => {
                segment_defect(category, "category must not be empty", "category must not contain ':'")
            }
            _ => None,
        }
    }
}

fn segment_defect(segment: &str, blank: &'static str, separator: &'static str) -> Option<&'static str> {
    if segment.trim().is_empty() {
        Some(blank)
    } else if segment.contains(':') {
        Some(separator)
    } else {
        None
    }
}

/// Freshness of each analytics request shape.
///
/// Defaults to five minutes for overviews and charts and thirty minutes for
/// competitor insights and benchmarks.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use trove_analytics::{AnalyticsTtls, TtlClass};
///
/// let ttls = AnalyticsTtls::default().with_class(TtlClass::Short, Duration::from_secs(60));
/// assert_eq!(ttls.client, Duration::from_secs(60));
/// assert_eq!(ttls.benchmarks, Duration::from_secs(1800));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsTtls {
    /// TTL of [`AnalyticsKey::Client`].
    pub client: Duration,
    /// TTL of [`AnalyticsKey::Business`].
    pub business: Duration,
    /// TTL of [`AnalyticsKey::ViewsChart`].
    pub views_chart: Duration,
    /// TTL of [`AnalyticsKey::ReviewsChart`].
    pub reviews_chart: Duration,
    /// TTL of [`AnalyticsKey::Competitors`].
    pub competitors: Duration,
    /// TTL of [`AnalyticsKey::Benchmarks`].
    pub benchmarks: Duration,
}

impl Default for AnalyticsTtls {
    fn default() -> Self {
        Self {
            client: SHORT_TTL,
            business: SHORT_TTL,
            views_chart: SHORT_TTL,
            reviews_chart: SHORT_TTL,
            competitors: MEDIUM_TTL,
            benchmarks: MEDIUM_TTL,
        }
    }
}

impl AnalyticsTtls {
    /// Sets the TTL of every request shape in `class`.
    #[must_use]
    pub fn with_class(mut self, class: TtlClass, ttl: Duration) -> Self {
        match class {
            TtlClass::Short => {
                self.client = ttl;
                self.business = ttl;
                self.views_chart = ttl;
                self.reviews_chart = ttl;
            }
            TtlClass::Medium => {
                self.competitors = ttl;
                self.benchmarks = ttl;
            }
        }
        self
    }

    /// The TTL applied to `key`.
    #[must_use]
    pub fn for_key(&self, key: &AnalyticsKey) -> Duration {
        match key {
            AnalyticsKey::Client { .. } => self.client,
            AnalyticsKey::Business { .. } => self.business,
            AnalyticsKey::ViewsChart { .. } => self.views_chart,
            AnalyticsKey::ReviewsChart { .. } => self.reviews_chart,
            AnalyticsKey::Competitors { .. } => self.competitors,
            AnalyticsKey::Benchmarks { .. } => self.benchmarks,
        }
    }
}
