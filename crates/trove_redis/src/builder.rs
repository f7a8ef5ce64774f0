// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for [`RedisTier`].

use std::time::Duration;

use trove_tier::Error;

use crate::tier::RedisTier;

/// How long establishing the connection may take when not configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a command may wait for its reply when not configured.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Builder for a [`RedisTier`].
///
/// Building only validates the URL; no connection is made until the tier is
/// first used.
///
/// # Examples
///
/// ```
/// use trove_redis::RedisTier;
///
/// let tier = RedisTier::builder("redis://localhost:6379")
///     .key_prefix("app:")
///     .build()
///     .expect("valid url");
/// assert_eq!(tier.key_prefix(), "app:");
///
/// assert!(RedisTier::builder("not a url").build().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RedisTierBuilder {
    pub(crate) url: String,
    pub(crate) key_prefix: String,
    pub(crate) connect_timeout: Duration,
    pub(crate) response_timeout: Duration,
}

impl RedisTierBuilder {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    /// Prepends `prefix` to every key.
    ///
    /// A non-empty prefix is also what allows [`clear`](trove_tier::CacheTier::clear):
    /// only keys under the prefix are deleted.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Bounds how long establishing the connection may take.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bounds how long any command waits for redis to reply.
    #[must_use]
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Builds the tier.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not a valid redis connection string.
    pub fn build(self) -> Result<RedisTier, Error> {
        let client = redis::Client::open(self.url.as_str()).map_err(Error::from_message)?;
        Ok(RedisTier::from_parts(client, self.key_prefix, self.connect_timeout, self.response_timeout))
    }
}
