// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Read, write, expiry and statistics behavior of the local-only service.

use std::{borrow::Cow, collections::BTreeMap, time::Duration};

use futures::executor::block_on;
use serde::{Deserialize, Serialize};
use tick::{Clock, ClockControl};
use trove::{CacheConfig, CacheService, CacheValue, ErrorKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Analytics {
    user_id: u64,
    total_views: u64,
    average_rating: f64,
    views_by_day: BTreeMap<String, u64>,
    top_businesses: Vec<String>,
}

impl CacheValue for Analytics {
    fn type_tag() -> Cow<'static, str> {
        Cow::Borrowed("analytics")
    }
}

fn sample() -> Analytics {
    Analytics {
        user_id: 42,
        total_views: 1_234,
        average_rating: 4.5,
        views_by_day: BTreeMap::from([("2024-05-01".to_string(), 10), ("2024-05-02".to_string(), 12)]),
        top_businesses: vec!["Bakery".to_string(), "Garage".to_string()],
    }
}

fn service(clock: Clock) -> CacheService {
    CacheService::builder(clock).build().expect("valid service")
}

#[test]
fn read_after_write() {
    let cache = service(Clock::new_frozen());

    block_on(async {
        cache.set("s", &"text".to_string(), None).await.expect("set");
        cache.set("n", &7_i64, None).await.expect("set");
        cache.set("b", &true, None).await.expect("set");
        cache.set("list", &vec![1_u32, 2, 3], None).await.expect("set");
        cache.set("none", &Option::<u64>::None, None).await.expect("set");

        assert_eq!(cache.get::<String>("s").await.expect("get"), Some("text".to_string()));
        assert_eq!(cache.get::<i64>("n").await.expect("get"), Some(7));
        assert_eq!(cache.get::<bool>("b").await.expect("get"), Some(true));
        assert_eq!(cache.get::<Vec<u32>>("list").await.expect("get"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get::<Option<u64>>("none").await.expect("get"), Some(None));
    });
}

#[test]
fn analytics_round_trip_within_ttl() {
    let control = ClockControl::new();
    let cache = service(control.to_clock());

    block_on(async {
        cache
            .set("user:42", &sample(), Some(Duration::from_secs(5 * 60)))
            .await
            .expect("set");

        control.advance(Duration::from_secs(4 * 60));
        assert_eq!(cache.get::<Analytics>("user:42").await.expect("get"), Some(sample()));
    });
}

#[test]
fn entries_expire_after_ttl() {
    let control = ClockControl::new();
    let cache = service(control.to_clock());

    block_on(async {
        cache.set("k", &1_u32, Some(Duration::from_millis(1))).await.expect("set");
        control.advance(Duration::from_millis(10));
        assert_eq!(cache.get::<u32>("k").await.expect("get"), None);
    });
}

#[tokio::test]
async fn entries_expire_after_ttl_in_real_time() {
    let cache = service(Clock::new_tokio());

    cache.set("k", &1_u32, Some(Duration::from_millis(1))).await.expect("set");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(cache.get::<u32>("k").await.expect("get"), None);
}

#[test]
fn omitted_ttl_uses_default() {
    let control = ClockControl::new();
    let cache = CacheService::builder(control.to_clock())
        .default_ttl(Duration::from_secs(60))
        .build()
        .expect("valid service");

    block_on(async {
        cache.set("k", &1_u32, None).await.expect("set");

        control.advance(Duration::from_secs(59));
        assert_eq!(cache.get::<u32>("k").await.expect("get"), Some(1));

        control.advance(Duration::from_secs(2));
        assert_eq!(cache.get::<u32>("k").await.expect("get"), None);
    });
}

#[test]
fn remove_before_ttl() {
    let cache = service(Clock::new_frozen());

    block_on(async {
        cache.set("user:42", &sample(), Some(Duration::from_secs(300))).await.expect("set");
        cache.remove::<Analytics>("user:42").await.expect("remove");
        assert_eq!(cache.get::<Analytics>("user:42").await.expect("get"), None);
    });
}

#[test]
fn remove_key_uses_qualified_key() {
    let cache = service(Clock::new_frozen());

    block_on(async {
        cache.set("k", &5_u64, None).await.expect("set");
        let key = cache.key_builder().build::<u64>("k").expect("valid key");
        cache.remove_key(&key).await;
        assert!(!cache.exists::<u64>("k").await.expect("exists"));
    });
}

#[test]
fn types_do_not_share_entries() {
    let cache = service(Clock::new_frozen());

    block_on(async {
        cache.set("42", &"forty-two".to_string(), None).await.expect("set");

        assert_eq!(cache.get::<u64>("42").await.expect("get"), None);
        assert!(cache.exists::<String>("42").await.expect("exists"));
        assert!(!cache.exists::<u64>("42").await.expect("exists"));
    });
}

#[test]
fn blank_keys_fail_fast() {
    let cache = service(Clock::new_frozen());

    block_on(async {
        let err = cache.get::<u64>("").await.expect_err("blank key");
        assert_eq!(err.kind(), ErrorKind::InvalidKey);

        let err = cache.set(" ", &1_u64, None).await.expect_err("blank key");
        assert_eq!(err.kind(), ErrorKind::InvalidKey);

        let err = cache
            .get_or_set("", None, || async { Ok::<_, std::io::Error>(1_u64) })
            .await
            .expect_err("blank key");
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
    });

    assert_eq!(block_on(cache.statistics()).lookups(), 0);
}

#[test]
fn statistics_count_every_lookup() {
    let cache = service(Clock::new_frozen());

    let last = block_on(async {
        let mut previous = cache.statistics().await;

        for round in 0_u64..5 {
            let key = format!("k{}", round % 2);
            let _ = cache.get::<u64>(&key).await.expect("get");
            cache.set(&key, &round, None).await.expect("set");
            let _ = cache.get::<u64>(&key).await.expect("get");
            let _ = cache
                .get_or_set(&format!("computed{round}"), None, || async { Ok::<_, std::io::Error>(round) })
                .await
                .expect("factory succeeds");

            let current = cache.statistics().await;
            assert!(current.hits >= previous.hits);
            assert!(current.misses >= previous.misses);
            assert!(current.last_updated >= previous.last_updated);
            previous = current;
        }

        previous
    });

    // Rounds 0 and 1 miss on first read, every later read hits, every computed key misses once.
    assert_eq!(last.hits, 8);
    assert_eq!(last.misses, 7);
}

#[test]
fn statistics_report_resident_keys() {
    let cache = service(Clock::new_frozen());

    block_on(async {
        for i in 0_u64..3 {
            cache.set(&format!("k{i}"), &i, None).await.expect("set");
        }
        cache.set("k0", &10_u64, None).await.expect("set");

        let stats = cache.statistics().await;
        assert_eq!(stats.resident_keys, 3);
        assert!(!stats.distributed_configured);
        assert!(!stats.distributed_available);

        cache.remove::<u64>("k1").await.expect("remove");
        assert_eq!(cache.statistics().await.resident_keys, 2);
    });
}

#[test]
fn clear_all_empties_local_tier() {
    let cache = service(Clock::new_frozen());

    block_on(async {
        cache.set("a", &1_u32, None).await.expect("set");
        cache.set("b", &2_u32, None).await.expect("set");

        cache.clear_all().await;

        assert_eq!(cache.get::<u32>("a").await.expect("get"), None);
        assert_eq!(cache.get::<u32>("b").await.expect("get"), None);
        assert_eq!(cache.statistics().await.resident_keys, 0);
    });
}

#[test]
fn unserializable_values_fail_fast() {
    #[derive(Serialize, Deserialize)]
    struct Grid(std::collections::HashMap<(u8, u8), u8>);

    impl CacheValue for Grid {
        fn type_tag() -> Cow<'static, str> {
            Cow::Borrowed("grid")
        }
    }

    let cache = service(Clock::new_frozen());
    let grid = Grid(std::collections::HashMap::from([((0, 0), 1)]));

    let err = block_on(cache.set("grid", &grid, None)).expect_err("tuple keys cannot be json object keys");
    assert_eq!(err.kind(), ErrorKind::Serialization);
}

#[test]
fn from_config_local_only() {
    let config: CacheConfig =
        serde_json::from_str(r#"{ "UseDistributedTier": false, "DefaultExpirationMinutes": 1 }"#).expect("valid json");
    let cache = CacheService::from_config(&config, Clock::new_frozen()).expect("valid config");

    assert_eq!(cache.default_ttl(), Duration::from_secs(60));
    block_on(async {
        cache.set("k", &1_u8, None).await.expect("set");
        assert_eq!(cache.get::<u8>("k").await.expect("get"), Some(1));
        assert!(!cache.statistics().await.distributed_configured);
    });
}

#[test]
fn from_config_rejects_distributed_without_url() {
    let config = CacheConfig {
        use_distributed_tier: true,
        ..CacheConfig::default()
    };
    let err = CacheService::from_config(&config, Clock::new_frozen()).expect_err("missing url");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
