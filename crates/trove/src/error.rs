// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error type for cache service operations.

use std::fmt;

/// What went wrong in a cache service call.
///
/// Tier failures never appear here: they are logged and degrade to a miss or
/// a no-op. What remains are caller bugs, the caller's own factory failing, and
/// cancellation by timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The logical key or namespace was empty.
    InvalidKey,
    /// The value could not be serialized.
    Serialization,
    /// The factory passed to `get_or_set` failed. The factory's error is the source.
    Factory,
    /// `get_or_set_with_timeout` ran out of time.
    Timeout,
    /// The cache could not be built from the supplied configuration.
    Configuration,
}

impl ErrorKind {
    /// Short lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidKey => "invalid key",
            Self::Serialization => "serialization",
            Self::Factory => "factory failed",
            Self::Timeout => "timed out",
            Self::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a [`CacheService`](crate::CacheService) call.
///
/// Use [`kind`](Self::kind) to branch on the failure and
/// `ohno::ErrorExt::find_source` to recover the underlying cause, such as the
/// error returned by a `get_or_set` factory.
///
/// # Examples
///
/// ```
/// use trove::{Error, ErrorKind};
///
/// let error = Error::with_kind(ErrorKind::InvalidKey, "logical key must not be empty");
/// assert_eq!(error.kind(), ErrorKind::InvalidKey);
/// assert!(error.to_string().contains("invalid key"));
/// ```
#[ohno::error]
#[display("cache operation failed: {kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// The category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Creates an error of the given kind caused by `cause`.
    ///
    /// For layers built on the cache that need to report failures in the
    /// cache's own terms, such as rejecting a key before it reaches the
    /// [`KeyBuilder`](crate::KeyBuilder).
    pub fn with_kind(kind: ErrorKind, cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(kind, cause)
    }
}
