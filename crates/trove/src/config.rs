// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Deserializable cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, ErrorKind};

const DEFAULT_NAMESPACE: &str = "towntrek";
const DEFAULT_EXPIRATION_MINUTES: u64 = 30;

/// Options recognized by [`CacheService::from_config`](crate::CacheService::from_config).
///
/// Field names are snake case; the two options host applications have always
/// carried also accept their `PascalCase` spelling.
///
/// # Examples
///
/// ```
/// use trove::CacheConfig;
///
/// let config: CacheConfig = serde_json::from_str(
///     r#"{ "UseDistributedTier": false, "DefaultExpirationMinutes": 10 }"#,
/// )?;
/// assert_eq!(config.default_ttl(), std::time::Duration::from_secs(600));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether to use the distributed (redis) tier. `false` means local-only.
    #[serde(alias = "UseDistributedTier")]
    pub use_distributed_tier: bool,
    /// TTL applied when a caller does not supply one.
    #[serde(alias = "DefaultExpirationMinutes")]
    pub default_expiration_minutes: u64,
    /// First segment of every key.
    pub namespace: String,
    /// Connection URL of the distributed tier, such as `redis://cache:6379`.
    pub redis_url: Option<String>,
    /// Prefix prepended to every distributed key. Required for the distributed tier to support clearing.
    pub redis_key_prefix: Option<String>,
    /// Maximum number of entries in the local tier. Unbounded when absent.
    pub local_max_capacity: Option<u64>,
    /// Copy distributed hits into the local tier.
    pub promote_distributed_hits: bool,
    /// Upper bound on establishing the distributed connection.
    pub connect_timeout_ms: Option<u64>,
    /// Upper bound on a single redis command reply.
    pub response_timeout_ms: Option<u64>,
    /// Upper bound on any distributed call, connecting included.
    pub distributed_timeout_ms: Option<u64>,
    /// How long the distributed tier is skipped after it fails.
    pub distributed_retry_ms: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            use_distributed_tier: false,
            default_expiration_minutes: DEFAULT_EXPIRATION_MINUTES,
            namespace: DEFAULT_NAMESPACE.to_string(),
            redis_url: None,
            redis_key_prefix: None,
            local_max_capacity: None,
            promote_distributed_hits: true,
            connect_timeout_ms: None,
            response_timeout_ms: None,
            distributed_timeout_ms: None,
            distributed_retry_ms: None,
        }
    }
}

impl CacheConfig {
    /// The default TTL as a [`Duration`].
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_expiration_minutes.saturating_mul(60))
    }

    /// Checks that the options describe a cache that can be built.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Configuration`] for a zero default expiration, or for
    /// enabling the distributed tier without a URL.
    pub fn validate(&self) -> Result<(), Error> {
        if self.default_expiration_minutes == 0 {
            return Err(Error::caused_by(
                ErrorKind::Configuration,
                "default_expiration_minutes must be greater than zero",
            ));
        }

        if self.use_distributed_tier && self.redis_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
            return Err(Error::caused_by(
                ErrorKind::Configuration,
                "use_distributed_tier is set but redis_url is missing",
            ));
        }

        Ok(())
    }
}
