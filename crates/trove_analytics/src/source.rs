// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{BusinessAnalytics, CategoryBenchmarks, ClientAnalytics, CompetitorInsights, Platform, ReviewsChart, ViewsChart};

/// The aggregation queries behind the cache.
///
/// Implementations typically run expensive database aggregations; the cache
/// calls each method at most once per key per miss episode.
pub trait AnalyticsSource: Send + Sync {
    /// Failure of an aggregation query.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Overview across every business `user_id` owns.
    fn client_analytics(&self, user_id: &str) -> impl Future<Output = Result<ClientAnalytics, Self::Error>> + Send;

    /// Totals for one business.
    fn business_analytics(&self, business_id: u64, user_id: &str) -> impl Future<Output = Result<BusinessAnalytics, Self::Error>> + Send;

    /// Views per day over the trailing `days`, filtered to `platform`.
    fn views_chart(&self, user_id: &str, days: u32, platform: Platform) -> impl Future<Output = Result<ViewsChart, Self::Error>> + Send;

    /// Reviews per day over the trailing `days`.
    fn reviews_chart(&self, user_id: &str, days: u32) -> impl Future<Output = Result<ReviewsChart, Self::Error>> + Send;

    /// Competing businesses for the user's categories.
    fn competitor_insights(&self, user_id: &str) -> impl Future<Output = Result<CompetitorInsights, Self::Error>> + Send;

    /// Category averages and the user's standing.
    fn category_benchmarks(&self, category: &str, user_id: &str) -> impl Future<Output = Result<CategoryBenchmarks, Self::Error>> + Send;
}
