// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Benchmarks for the hit path and for degraded operation.

#![allow(missing_docs, reason = "Benchmark code")]

use std::{hint::black_box, time::Instant};

use criterion::{Criterion, criterion_group, criterion_main};
use tick::Clock;
use tokio::runtime::Runtime;
use trove::{CacheService, testing::MockTier};

fn rt() -> Runtime {
    Runtime::new().expect("failed to create runtime")
}

fn bench_operations(c: &mut Criterion) {
    let rt = rt();
    let mut group = c.benchmark_group("operations");

    group.bench_function("local_hit", |b| {
        let cache = rt.block_on(async {
            let cache = CacheService::builder(Clock::new_tokio()).build().expect("valid service");
            cache.set("user:42", &42_u64, None).await.expect("set");
            cache
        });

        b.iter_custom(|iters| {
            rt.block_on(async {
                let start = Instant::now();
                for _ in 0..iters {
                    let _ = black_box(cache.get::<u64>(black_box("user:42")).await);
                }
                start.elapsed()
            })
        });
    });

    group.bench_function("get_or_set_hit", |b| {
        let cache = rt.block_on(async {
            let cache = CacheService::builder(Clock::new_tokio()).build().expect("valid service");
            cache.set("user:42", &42_u64, None).await.expect("set");
            cache
        });

        b.iter_custom(|iters| {
            rt.block_on(async {
                let start = Instant::now();
                for _ in 0..iters {
                    let _ = black_box(
                        cache
                            .get_or_set("user:42", None, || async { Ok::<_, std::io::Error>(0_u64) })
                            .await,
                    );
                }
                start.elapsed()
            })
        });
    });

    group.bench_function("miss_with_failing_distributed", |b| {
        let cache = rt.block_on(async {
            let remote = MockTier::<String, String>::new();
            remote.fail_when(|_| true);
            CacheService::builder(Clock::new_tokio())
                .distributed(remote)
                .build()
                .expect("valid service")
        });

        b.iter_custom(|iters| {
            rt.block_on(async {
                let start = Instant::now();
                for _ in 0..iters {
                    let _ = black_box(cache.get::<u64>(black_box("absent")).await);
                }
                start.elapsed()
            })
        });
    });

    group.bench_function("set", |b| {
        let cache = rt.block_on(async { CacheService::builder(Clock::new_tokio()).build().expect("valid service") });
        let mut i = 0_u64;

        b.iter_custom(|iters| {
            rt.block_on(async {
                let start = Instant::now();
                for _ in 0..iters {
                    i = i.wrapping_add(1);
                    let _ = black_box(cache.set("counter", &i, None).await);
                }
                start.elapsed()
            })
        });
    });

    group.finish();
}

criterion_group!(benches, bench_operations);
criterion_main!(benches);
