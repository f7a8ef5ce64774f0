// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Behavior with a distributed tier that fails, recovers, or holds foreign data.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::executor::block_on;
use tick::{Clock, ClockControl};
use trove::{
    CacheEntry, CacheService, CacheTier, PromotionPolicy, TierError,
    testing::{LogCapture, MockTier, TierOp},
};

type Remote = MockTier<String, String>;

fn service_with(remote: &Remote, clock: Clock) -> CacheService {
    CacheService::builder(clock)
        .distributed(remote.clone())
        .build()
        .expect("valid service")
}

fn remote_gets(remote: &Remote) -> usize {
    remote.operations().iter().filter(|op| matches!(op, TierOp::Get(_))).count()
}

#[test]
fn every_operation_survives_a_dead_distributed_tier() {
    let remote = Remote::new();
    remote.fail_when(|_| true);
    let cache = service_with(&remote, Clock::new_frozen());

    block_on(async {
        cache.set("user:42", &42_u64, None).await.expect("set");
        assert_eq!(cache.get::<u64>("user:42").await.expect("get"), Some(42));
        assert!(cache.exists::<u64>("user:42").await.expect("exists"));

        let computed = cache
            .get_or_set("user:7", None, || async { Ok::<_, std::io::Error>(7_u64) })
            .await
            .expect("factory succeeds");
        assert_eq!(computed, 7);
        assert_eq!(cache.get::<u64>("user:7").await.expect("get"), Some(7));

        cache.remove::<u64>("user:42").await.expect("remove");
        assert_eq!(cache.get::<u64>("user:42").await.expect("get"), None);

        cache.clear_all().await;
        assert_eq!(cache.get::<u64>("user:7").await.expect("get"), None);

        let stats = cache.statistics().await;
        assert!(stats.distributed_configured);
        assert!(!stats.distributed_available);
    });

    assert_eq!(remote.entry_count(), 0);
}

#[test]
fn distributed_failures_are_logged_as_warnings() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    let remote = Remote::new();
    remote.fail_when(|_| true);
    let cache = service_with(&remote, Clock::new_frozen());

    block_on(async {
        cache.set("user:42", &1_u64, None).await.expect("set");
        let _ = cache.get::<u64>("user:43").await.expect("get");
    });

    capture.assert_contains("WARN");
    capture.assert_contains("distributed tier unavailable");
    capture.assert_contains("towntrek:u64:user:42");
    assert!(!capture.output().contains("ERROR"), "{}", capture.output());

    // The tier is resting after the first failure, so the read is not attempted or logged.
    assert_eq!(capture.output().matches("distributed tier unavailable").count(), 1);
    assert!(!capture.output().contains("towntrek:u64:user:43"));
}

#[test]
fn writes_reach_both_tiers() {
    let remote = Remote::new();
    let cache = service_with(&remote, Clock::new_frozen());

    block_on(cache.set("user:42", &"Ada".to_string(), Some(Duration::from_secs(60)))).expect("set");

    let stored = remote.peek(&"towntrek:string:user:42".to_string()).expect("written remotely");
    assert_eq!(stored.value(), "\"Ada\"");
    assert_eq!(stored.ttl(), Some(Duration::from_secs(60)));

    // The local copy answers without another remote read.
    remote.clear_operations();
    assert_eq!(block_on(cache.get::<String>("user:42")).expect("get"), Some("Ada".to_string()));
    assert_eq!(remote_gets(&remote), 0);
}

#[test]
fn exists_checks_distributed_tier_first() {
    let remote = Remote::new();
    let cache = service_with(&remote, Clock::new_frozen());

    block_on(async {
        assert!(!cache.exists::<u64>("k").await.expect("exists"));
    });

    assert_eq!(remote.operations(), vec![TierOp::Get("towntrek:u64:k".to_string())]);
}

#[test]
fn distributed_hits_are_promoted() {
    let remote = Remote::new();
    let clock = Clock::new_frozen();
    let writer = service_with(&remote, clock.clone());
    let reader = service_with(&remote, clock);

    block_on(async {
        writer.set("user:42", &5_u64, None).await.expect("set");
        assert_eq!(reader.get::<u64>("user:42").await.expect("get"), Some(5));

        remote.fail_when(|_| true);
        assert_eq!(reader.get::<u64>("user:42").await.expect("get"), Some(5));
    });
}

#[test]
fn promotion_can_be_disabled() {
    let remote = Remote::new();
    let clock = Clock::new_frozen();
    let writer = service_with(&remote, clock.clone());
    let reader = CacheService::builder(clock)
        .distributed(remote.clone())
        .promotion_policy(PromotionPolicy::Never)
        .build()
        .expect("valid service");

    block_on(async {
        writer.set("user:42", &5_u64, None).await.expect("set");
        assert_eq!(reader.get::<u64>("user:42").await.expect("get"), Some(5));

        remote.fail_when(|_| true);
        assert_eq!(reader.get::<u64>("user:42").await.expect("get"), None);
    });
}

#[test]
fn promoted_entries_keep_remaining_lifetime() {
    let remote = Remote::new();
    let control = ClockControl::new();
    let writer = service_with(&remote, control.to_clock());
    let reader = service_with(&remote, control.to_clock());

    block_on(async {
        writer.set("user:42", &5_u64, Some(Duration::from_secs(60))).await.expect("set");

        control.advance(Duration::from_secs(40));
        assert_eq!(reader.get::<u64>("user:42").await.expect("get"), Some(5));

        remote.fail_when(|_| true);
        control.advance(Duration::from_secs(10));
        assert_eq!(reader.get::<u64>("user:42").await.expect("get"), Some(5));

        control.advance(Duration::from_secs(11));
        assert_eq!(reader.get::<u64>("user:42").await.expect("get"), None);
    });
}

#[test]
fn unreadable_payload_is_a_logged_miss() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    let remote = Remote::new();
    block_on(remote.insert(&"towntrek:u64:user:42".to_string(), CacheEntry::new("not json".to_string()))).expect("seeded");
    let cache = service_with(&remote, Clock::new_frozen());

    block_on(async {
        assert_eq!(cache.get::<u64>("user:42").await.expect("get"), None);

        let value = cache
            .get_or_set("user:42", None, || async { Ok::<_, std::io::Error>(8_u64) })
            .await
            .expect("recomputed");
        assert_eq!(value, 8);
        assert_eq!(cache.get::<u64>("user:42").await.expect("get"), Some(8));

        let stats = cache.statistics().await;
        assert_eq!((stats.hits, stats.misses), (1, 2));
    });

    capture.assert_contains("discarding unreadable cache payload");
}

#[test]
fn availability_follows_the_reachability_check() {
    let remote = Remote::new();
    let cache = service_with(&remote, Clock::new_frozen());

    remote.fail_when(|op| matches!(op, TierOp::Ping));
    assert!(!block_on(cache.statistics()).distributed_available);
    assert!(!cache.distributed_available());

    remote.clear_failures();
    assert!(block_on(cache.statistics()).distributed_available);
    assert!(cache.distributed_available());
}

#[test]
fn clear_all_reaches_distributed_tier() {
    let remote = Remote::new();
    let cache = service_with(&remote, Clock::new_frozen());

    block_on(async {
        cache.set("a", &1_u8, None).await.expect("set");
        cache.clear_all().await;
    });

    assert!(remote.operations().contains(&TierOp::Clear));
    assert_eq!(remote.entry_count(), 0);
}

#[test]
fn failed_distributed_tier_rests_until_the_retry_interval() {
    let remote = Remote::new();
    remote.fail_when(|_| true);
    let control = ClockControl::new();
    let cache = CacheService::builder(control.to_clock())
        .distributed(remote.clone())
        .distributed_retry_interval(Duration::from_secs(10))
        .build()
        .expect("valid service");

    block_on(async {
        assert_eq!(cache.get::<u64>("user:42").await.expect("get"), None);
        assert_eq!(remote.operations().len(), 1);

        cache.set("user:42", &1_u64, None).await.expect("set");
        assert!(cache.exists::<u64>("user:42").await.expect("exists"));
        cache.remove::<u64>("user:42").await.expect("remove");
        assert_eq!(remote.operations().len(), 1, "calls are skipped while resting");

        control.advance(Duration::from_secs(10));
        remote.clear_failures();
        cache.set("user:42", &2_u64, None).await.expect("set");
        assert!(cache.distributed_available());
        assert!(remote.contains_key(&"towntrek:u64:user:42".to_string()));
    });
}

#[test]
fn failed_trial_call_restarts_the_interval() {
    let remote = Remote::new();
    remote.fail_when(|_| true);
    let control = ClockControl::new();
    let cache = CacheService::builder(control.to_clock())
        .distributed(remote.clone())
        .distributed_retry_interval(Duration::from_secs(10))
        .build()
        .expect("valid service");

    block_on(async {
        let _ = cache.get::<u64>("k").await.expect("get");
        control.advance(Duration::from_secs(10));
        let _ = cache.get::<u64>("k").await.expect("get");
        let _ = cache.get::<u64>("k").await.expect("get");
        assert_eq!(remote_gets(&remote), 2);

        control.advance(Duration::from_secs(5));
        let _ = cache.get::<u64>("k").await.expect("get");
        assert_eq!(remote_gets(&remote), 2);
    });

    assert!(!cache.distributed_available());
}

#[test]
fn reachability_check_brings_a_resting_tier_back() {
    let remote = Remote::new();
    remote.fail_when(|op| matches!(op, TierOp::Get(_)));
    let cache = service_with(&remote, Clock::new_frozen());

    block_on(async {
        let _ = cache.get::<u64>("k").await.expect("get");
        assert!(!cache.distributed_available());

        remote.clear_failures();
        assert!(cache.statistics().await.distributed_available);

        cache.set("k", &3_u64, None).await.expect("set");
    });

    assert!(remote.contains_key(&"towntrek:u64:k".to_string()));
}

/// A distributed tier that accepts calls and never answers them.
#[derive(Debug, Clone, Default)]
struct Unresponsive {
    calls: Arc<AtomicUsize>,
}

impl Unresponsive {
    async fn hang<T>(&self) -> Result<T, TierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

impl CacheTier<String, String> for Unresponsive {
    async fn get(&self, _key: &String) -> Result<Option<CacheEntry<String>>, TierError> {
        self.hang().await
    }

    async fn insert(&self, _key: &String, _entry: CacheEntry<String>) -> Result<(), TierError> {
        self.hang().await
    }

    async fn invalidate(&self, _key: &String) -> Result<(), TierError> {
        self.hang().await
    }

    async fn clear(&self) -> Result<(), TierError> {
        self.hang().await
    }
}

#[test]
fn unresponsive_distributed_tier_is_abandoned_after_the_timeout() {
    let remote = Unresponsive::default();
    let control = ClockControl::new().auto_advance_timers(true);
    let clock = control.to_clock();
    let cache = CacheService::builder(clock.clone())
        .distributed(remote.clone())
        .distributed_timeout(Duration::from_millis(500))
        .distributed_retry_interval(Duration::from_secs(30))
        .build()
        .expect("valid service");

    block_on(async {
        let started = clock.instant();
        let value = cache
            .get_or_set("user:42", None, || async { Ok::<_, std::io::Error>(42_u64) })
            .await
            .expect("factory succeeds");
        assert_eq!(value, 42);

        // One abandoned read; the write that follows is skipped.
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
        let waited = clock.instant().saturating_duration_since(started);
        assert!(waited >= Duration::from_millis(500), "waited {waited:?}");
        assert!(waited < Duration::from_secs(30), "waited {waited:?}");
        assert!(!cache.distributed_available());

        assert_eq!(cache.get::<u64>("user:42").await.expect("get"), Some(42));
        assert_eq!(cache.get::<u64>("user:7").await.expect("get"), None);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    });
}
