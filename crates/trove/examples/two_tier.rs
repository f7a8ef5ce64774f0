// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Caches an expensive lookup and shows what happens when the distributed tier
//! fails.
//!
//! Runs without a redis server: the distributed tier is an in-memory double
//! that is switched off halfway through. Set `TROVE_REDIS_URL` to use redis.

use std::time::Duration;

use tick::Clock;
use trove::{CacheConfig, CacheService, testing::MockTier};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Overview {
    views: u64,
    reviews: u32,
}

impl trove::CacheValue for Overview {
    fn type_tag() -> std::borrow::Cow<'static, str> {
        "overview".into()
    }
}

async fn load_overview(user_id: u64) -> Result<Overview, std::io::Error> {
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(Overview {
        views: user_id * 10,
        reviews: 3,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let remote = MockTier::<String, String>::new();
    let cache = match std::env::var("TROVE_REDIS_URL") {
        Ok(url) => {
            let config = CacheConfig {
                use_distributed_tier: true,
                redis_url: Some(url),
                redis_key_prefix: Some("trove-example:".to_string()),
                ..CacheConfig::default()
            };
            CacheService::from_config(&config, Clock::new_tokio())?
        }
        Err(_) => CacheService::builder(Clock::new_tokio()).distributed(remote.clone()).build()?,
    };

    let first = cache.get_or_set("client:42", None, || load_overview(42)).await?;
    let second = cache.get_or_set("client:42", None, || load_overview(42)).await?;
    println!("computed {first:?}, then served {second:?} from cache");

    remote.fail_when(|_| true);
    cache.set("client:43", &Overview { views: 1, reviews: 0 }, None).await?;
    println!("local tier still answers: {:?}", cache.get::<Overview>("client:43").await?);

    let stats = cache.statistics().await;
    println!(
        "hits={} misses={} resident={} distributed_available={}",
        stats.hits, stats.misses, stats.resident_keys, stats.distributed_available
    );

    Ok(())
}
