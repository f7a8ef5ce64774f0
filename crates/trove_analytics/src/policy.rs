// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Memoizes analytics aggregates in a [`CacheService`].

use std::time::Duration;

use futures::future::join_all;
use trove::{CacheKey, CacheService, CacheStatistics, CacheValue, Error, ErrorKind};

use crate::{
    AnalyticsKey, AnalyticsSource, AnalyticsTtls, BusinessAnalytics, CategoryBenchmarks, ClientAnalytics, CompetitorInsights,
    Platform, ReviewsChart, ViewsChart, index::OwnerIndex,
};

/// Serves analytics from the cache, computing through an [`AnalyticsSource`]
/// on a miss.
///
/// Each request shape has its own key and TTL (see [`AnalyticsKey`] and
/// [`AnalyticsTtls`]). Concurrent requests for the same aggregate run the
/// query once.
///
/// Every key served is recorded against its user, so
/// [`invalidate_user`](Self::invalidate_user) can remove exactly those keys.
/// Keys written by other processes are not known here and lapse by TTL.
#[derive(Debug)]
pub struct AnalyticsCache<S> {
    cache: CacheService,
    source: S,
    ttls: AnalyticsTtls,
    index: OwnerIndex,
}

impl<S: AnalyticsSource> AnalyticsCache<S> {
    /// Creates a policy with the default TTL table.
    #[must_use]
    pub fn new(cache: CacheService, source: S) -> Self {
        Self::with_ttls(cache, source, AnalyticsTtls::default())
    }

    /// Creates a policy with a custom TTL table.
    #[must_use]
    pub fn with_ttls(cache: CacheService, source: S, ttls: AnalyticsTtls) -> Self {
        Self {
            cache,
            source,
            ttls,
            index: OwnerIndex::default(),
        }
    }

    /// The underlying cache service.
    #[must_use]
    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    /// The aggregation queries.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The TTL table in effect.
    #[must_use]
    pub fn ttls(&self) -> &AnalyticsTtls {
        &self.ttls
    }

    /// Overview across every business the user owns.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidKey`] for a blank user id or one containing
    /// `:`, and [`ErrorKind::Factory`] if the query fails.
    pub async fn client_analytics(&self, user_id: &str) -> Result<ClientAnalytics, Error> {
        let key = AnalyticsKey::Client {
            user_id: user_id.to_string(),
        };
        self.fetch(key, || self.source.client_analytics(user_id)).await
    }

    /// Totals for one business.
    ///
    /// # Errors
    ///
    /// As for [`client_analytics`](Self::client_analytics).
    pub async fn business_analytics(&self, business_id: u64, user_id: &str) -> Result<BusinessAnalytics, Error> {
        let key = AnalyticsKey::Business {
            business_id,
            user_id: user_id.to_string(),
        };
        self.fetch(key, || self.source.business_analytics(business_id, user_id)).await
    }

    /// Views per day over the trailing `days`.
    ///
    /// # Errors
    ///
    /// As for [`client_analytics`](Self::client_analytics).
    pub async fn views_chart(&self, user_id: &str, days: u32, platform: Platform) -> Result<ViewsChart, Error> {
        let key = AnalyticsKey::ViewsChart {
            user_id: user_id.to_string(),
            days,
            platform,
        };
        self.fetch(key, || self.source.views_chart(user_id, days, platform)).await
    }

    /// Reviews per day over the trailing `days`.
    ///
    /// # Errors
    ///
    /// As for [`client_analytics`](Self::client_analytics).
    pub async fn reviews_chart(&self, user_id: &str, days: u32) -> Result<ReviewsChart, Error> {
        let key = AnalyticsKey::ReviewsChart {
            user_id: user_id.to_string(),
            days,
        };
        self.fetch(key, || self.source.reviews_chart(user_id, days)).await
    }

    /// Competing businesses for the user's categories.
    ///
    /// # Errors
    ///
    /// As for [`client_analytics`](Self::client_analytics).
    pub async fn competitor_insights(&self, user_id: &str) -> Result<CompetitorInsights, Error> {
        let key = AnalyticsKey::Competitors {
            user_id: user_id.to_string(),
        };
        self.fetch(key, || self.source.competitor_insights(user_id)).await
    }

    /// Category averages and the user's standing.
    ///
    /// # Errors
    ///
    /// As for [`client_analytics`](Self::client_analytics), and
    /// [`ErrorKind::InvalidKey`] for a blank category or one containing `:`.
    pub async fn category_benchmarks(&self, category: &str, user_id: &str) -> Result<CategoryBenchmarks, Error> {
        let key = AnalyticsKey::Benchmarks {
            category: category.to_string(),
            user_id: user_id.to_string(),
        };
        self.fetch(key, || self.source.category_benchmarks(category, user_id)).await
    }

    /// Removes every analytics entry this process issued for `user_id`.
    ///
    /// Returns the number of keys removed.
    pub async fn invalidate_user(&self, user_id: &str) -> usize {
        let keys = self.index.take(user_id, self.cache.clock().system_time());
        join_all(keys.iter().map(|key| self.cache.remove_key(key))).await;

        tracing::info!(analytics.user = user_id, analytics.removed = keys.len(), "invalidated user analytics");
        keys.len()
    }

    /// Removes the cached totals for one business.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidKey`] for a blank user id or one containing `:`.
    pub async fn invalidate_business(&self, business_id: u64, user_id: &str) -> Result<(), Error> {
        let key = AnalyticsKey::Business {
            business_id,
            user_id: user_id.to_string(),
        };
        Self::check(&key)?;

        let qualified = self.cache.key_builder().build::<BusinessAnalytics>(&key.logical())?;
        self.cache.remove_key(&qualified).await;
        self.index.forget(user_id, &qualified);
        Ok(())
    }

    /// Number of live keys recorded for `user_id`.
    #[must_use]
    pub fn tracked_keys(&self, user_id: &str) -> usize {
        self.index.tracked(user_id, self.cache.clock().system_time())
    }

    /// Cache counters, for admin tooling. Also prunes stale index records.
    pub async fn statistics(&self) -> CacheStatistics {
        self.index.prune(self.cache.clock().system_time());
        self.cache.statistics().await
    }

    /// Wipes the cache and the key index.
    pub async fn clear_all(&self) {
        self.cache.clear_all().await;
        self.index.clear();
    }

    async fn fetch<T, F, Fut>(&self, key: AnalyticsKey, factory: F) -> Result<T, Error>
    where
        T: CacheValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, S::Error>>,
    {
        Self::check(&key)?;

        let ttl = self.ttls.for_key(&key);
        let logical = key.logical();
        let qualified = self.cache.key_builder().build::<T>(&logical)?;

        // Recorded before the value is stored so an invalidation racing the
        // query still finds the key.
        self.record(key.owner(), &qualified, ttl);
        match self.cache.get_or_set(&logical, Some(ttl), factory).await {
            Ok(value) => {
                self.record(key.owner(), &qualified, ttl);
                Ok(value)
            }
            Err(e) => {
                self.index.forget(key.owner(), &qualified);
                Err(e)
            }
        }
    }

    fn record(&self, owner: &str, qualified: &CacheKey, ttl: Duration) {
        let now = self.cache.clock().system_time();
        self.index.record(owner, qualified.clone(), now.checked_add(ttl).unwrap_or(now), now);
    }

    fn check(key: &AnalyticsKey) -> Result<(), Error> {
        match key.defect() {
            Some(defect) => Err(Error::with_kind(ErrorKind::InvalidKey, defect)),
            None => Ok(()),
        }
    }
}
