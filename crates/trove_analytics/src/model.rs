// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Aggregates produced by the analytics queries and stored in the cache.

use std::{borrow::Cow, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use trove::CacheValue;

/// Channel a view was recorded on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Every channel combined.
    #[default]
    All,
    /// Browser traffic.
    Web,
    /// Mobile app traffic.
    Mobile,
    /// Third-party API traffic.
    Api,
}

impl Platform {
    /// Lowercase name, as used in cache keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Web => "web",
            Self::Mobile => "mobile",
            Self::Api => "api",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown platform name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlatform(String);

impl fmt::Display for UnknownPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown platform '{}'", self.0)
    }
}

impl std::error::Error for UnknownPlatform {}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "web" => Ok(Self::Web),
            "mobile" => Ok(Self::Mobile),
            "api" => Ok(Self::Api),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

/// Engagement totals for one business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessAnalytics {
    /// Business identifier.
    pub business_id: u64,
    /// Display name.
    pub business_name: String,
    /// Directory category, such as `"restaurants"`.
    pub category: String,
    /// Page views over the business lifetime.
    pub total_views: u64,
    /// Published reviews.
    pub total_reviews: u64,
    /// Users who favorited the business.
    pub total_favorites: u64,
    /// Mean review rating, `0.0` without reviews.
    pub average_rating: f64,
    /// Weighted blend of views, reviews and favorites.
    pub engagement_score: f64,
}

/// Overview across every business a user owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientAnalytics {
    /// Owner identifier.
    pub user_id: String,
    /// Sum of views across businesses.
    pub total_views: u64,
    /// Sum of reviews across businesses.
    pub total_reviews: u64,
    /// Sum of favorites across businesses.
    pub total_favorites: u64,
    /// Review-weighted mean rating.
    pub average_rating: f64,
    /// Per-business breakdown.
    pub businesses: Vec<BusinessAnalytics>,
}

/// One day in a time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    /// Day in `YYYY-MM-DD` form.
    pub date: String,
    /// Events recorded that day.
    pub count: u64,
}

/// Views per day over a trailing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewsChart {
    /// Window length.
    pub days: u32,
    /// Channel the views were filtered to.
    pub platform: Platform,
    /// One point per day, oldest first.
    pub points: Vec<DailyCount>,
}

/// Reviews per day over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewsChart {
    /// Window length.
    pub days: u32,
    /// One point per day, oldest first.
    pub points: Vec<DailyCount>,
    /// Mean rating of the reviews in the window.
    pub average_rating: f64,
}

/// A nearby business in the same category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    /// Display name.
    pub business_name: String,
    /// Directory category.
    pub category: String,
    /// Mean review rating.
    pub average_rating: f64,
    /// Page views over the business lifetime.
    pub total_views: u64,
}

/// How a user's businesses compare with their competitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorInsights {
    /// Owner identifier.
    pub user_id: String,
    /// Competitors, strongest first.
    pub competitors: Vec<Competitor>,
}

/// Category-wide averages and the user's standing against them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBenchmarks {
    /// Directory category.
    pub category: String,
    /// Businesses in the category.
    pub business_count: u64,
    /// Mean views per business.
    pub average_views: f64,
    /// Mean reviews per business.
    pub average_reviews: f64,
    /// Mean rating across the category.
    pub average_rating: f64,
    /// The user's engagement percentile within the category, `0.0..=100.0`.
    pub user_percentile: f64,
}

macro_rules! cache_value {
    ($($ty:ty => $tag:literal),* $(,)?) => {
        $(
            impl CacheValue for $ty {
                fn type_tag() -> Cow<'static, str> {
                    Cow::Borrowed($tag)
                }
            }
        )*
    };
}

cache_value! {
    ClientAnalytics => "client-analytics",
    BusinessAnalytics => "business-analytics",
    ViewsChart => "views-chart",
    ReviewsChart => "reviews-chart",
    CompetitorInsights => "competitor-insights",
    CategoryBenchmarks => "category-benchmarks",
}
