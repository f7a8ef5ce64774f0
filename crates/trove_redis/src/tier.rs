// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Distributed tier implementation using redis.

use std::{fmt, sync::Arc, time::Duration};

use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tokio::sync::OnceCell;
use trove_tier::{CacheEntry, CacheTier, Error};

use crate::builder::RedisTierBuilder;

const SCAN_BATCH: usize = 250;

/// A redis-backed tier storing string payloads.
///
/// Clones share the connection.
#[derive(Clone)]
pub struct RedisTier {
    inner: Arc<Inner>,
}

struct Inner {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    key_prefix: String,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl fmt::Debug for RedisTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisTier")
            .field("key_prefix", &self.inner.key_prefix)
            .field("connected", &self.inner.connection.initialized())
            .finish_non_exhaustive()
    }
}

impl RedisTier {
    /// Returns a builder for a tier talking to `url` (for example `redis://host:6379/0`).
    #[must_use]
    pub fn builder(url: impl Into<String>) -> RedisTierBuilder {
        RedisTierBuilder::new(url)
    }

    /// The prefix prepended to every key.
    #[must_use]
    pub fn key_prefix(&self) -> &str {
        &self.inner.key_prefix
    }

    pub(crate) fn from_parts(client: redis::Client, key_prefix: String, connect_timeout: Duration, response_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                connection: OnceCell::new(),
                key_prefix,
                connect_timeout,
                response_timeout,
            }),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.inner.key_prefix)
    }

    async fn connection(&self) -> Result<ConnectionManager, Error> {
        let inner = &self.inner;
        let manager = inner
            .connection
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new()
                    .set_connection_timeout(inner.connect_timeout)
                    .set_response_timeout(inner.response_timeout)
                    .set_number_of_retries(1);
                let connect = ConnectionManager::new_with_config(inner.client.clone(), config);
                match tokio::time::timeout(inner.connect_timeout, connect).await {
                    Ok(Ok(manager)) => {
                        tracing::info!(redis.prefix = %inner.key_prefix, "redis tier connected");
                        Ok(manager)
                    }
                    Ok(Err(e)) => Err(Error::from_message(e)),
                    Err(_elapsed) => Err(Error::from_message(format!(
                        "redis connection not established within {}ms",
                        inner.connect_timeout.as_millis()
                    ))),
                }
            })
            .await?;
        Ok(manager.clone())
    }
}

impl CacheTier<String, String> for RedisTier {
    async fn get(&self, key: &String) -> Result<Option<CacheEntry<String>>, Error> {
        let mut conn = self.connection().await?;
        let key = self.full_key(key);
        let (value, pttl): (Option<String>, i64) = redis::pipe()
            .cmd("GET")
            .arg(&key)
            .cmd("PTTL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(Error::from_message)?;
        Ok(entry_from_reply(value, pttl))
    }

    async fn insert(&self, key: &String, entry: CacheEntry<String>) -> Result<(), Error> {
        let mut conn = self.connection().await?;
        let ttl = entry.ttl();
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.full_key(key)).arg(entry.into_value());
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let () = cmd.query_async(&mut conn).await.map_err(Error::from_message)?;
        Ok(())
    }

    async fn invalidate(&self, key: &String) -> Result<(), Error> {
        let mut conn = self.connection().await?;
        let _removed: i64 = redis::cmd("DEL")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await
            .map_err(Error::from_message)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        if self.inner.key_prefix.is_empty() {
            return Err(Error::from_message("refusing to clear a redis tier without a key prefix"));
        }

        let mut conn = self.connection().await?;
        let pattern = scan_pattern(&self.inner.key_prefix);
        let mut cursor: u64 = 0;
        let mut deleted: i64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(Error::from_message)?;

            if !keys.is_empty() {
                let removed: i64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await
                    .map_err(Error::from_message)?;
                deleted += removed;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        tracing::info!(redis.prefix = %self.inner.key_prefix, redis.deleted = deleted, "redis tier cleared");
        Ok(())
    }

    async fn ping(&self) -> Result<(), Error> {
        let mut conn = self.connection().await?;
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await.map_err(Error::from_message)?;
        Ok(())
    }
}

/// `PX` argument for `ttl`; redis rejects zero, so anything shorter rounds up to 1ms.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Builds an entry from a `GET` + `PTTL` reply.
///
/// `PTTL` is -1 for keys without expiry and -2 for missing keys.
fn entry_from_reply(value: Option<String>, pttl: i64) -> Option<CacheEntry<String>> {
    let value = value?;
    Some(match u64::try_from(pttl) {
        Ok(ms) if ms > 0 => CacheEntry::with_ttl(value, Duration::from_millis(ms)),
        _ => CacheEntry::new(value),
    })
}

/// `SCAN MATCH` pattern covering every key under `prefix`, with glob characters escaped.
fn scan_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}
