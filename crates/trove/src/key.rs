// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Type-qualified cache keys.

use std::{borrow::Cow, fmt};

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, ErrorKind};

/// A value the cache can store.
///
/// The type tag becomes part of every key the value is stored under, so two
/// types sharing a logical key never collide. Tags must be stable across builds
/// and releases: pick a fixed string, never `std::any::type_name`.
///
/// # Examples
///
/// ```
/// use std::borrow::Cow;
/// use serde::{Deserialize, Serialize};
/// use trove::CacheValue;
///
/// #[derive(Serialize, Deserialize)]
/// struct Profile {
///     name: String,
/// }
///
/// impl CacheValue for Profile {
///     fn type_tag() -> Cow<'static, str> {
///         Cow::Borrowed("profile")
///     }
/// }
/// ```
pub trait CacheValue: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable identifier of this type inside cache keys.
    fn type_tag() -> Cow<'static, str>;
}

macro_rules! impl_cache_value {
    ($($ty:ty => $tag:literal),* $(,)?) => {
        $(
            impl CacheValue for $ty {
                fn type_tag() -> Cow<'static, str> {
                    Cow::Borrowed($tag)
                }
            }
        )*
    };
}

impl_cache_value! {
    String => "string",
    bool => "bool",
    u8 => "u8",
    i32 => "i32",
    i64 => "i64",
    u32 => "u32",
    u64 => "u64",
    f64 => "f64",
}

impl<T: CacheValue> CacheValue for Vec<T> {
    fn type_tag() -> Cow<'static, str> {
        Cow::Owned(format!("list<{}>", T::type_tag()))
    }
}

impl<T: CacheValue> CacheValue for Option<T> {
    fn type_tag() -> Cow<'static, str> {
        Cow::Owned(format!("option<{}>", T::type_tag()))
    }
}

/// A fully-qualified cache key: `{namespace}:{type_tag}:{logical}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// The key as sent to the tiers.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn as_string(&self) -> &String {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds fully-qualified keys from logical keys and value types.
///
/// Building is pure: the same logical key and type always give the same key.
///
/// # Examples
///
/// ```
/// use trove::KeyBuilder;
///
/// let keys = KeyBuilder::new("towntrek")?;
/// let key = keys.build::<String>("client:42")?;
/// assert_eq!(key.as_str(), "towntrek:string:client:42");
///
/// assert_ne!(keys.build::<u64>("client:42")?, key);
/// assert!(keys.build::<String>("").is_err());
/// # Ok::<(), trove::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    namespace: String,
}

impl KeyBuilder {
    /// Creates a builder for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidKey`] if `namespace` is blank.
    pub fn new(namespace: impl Into<String>) -> Result<Self, Error> {
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(Error::caused_by(ErrorKind::InvalidKey, "namespace must not be empty"));
        }
        Ok(Self { namespace })
    }

    /// The namespace every key starts with.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Qualifies `logical` with the namespace and `T`'s type tag.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidKey`] if `logical` is blank.
    pub fn build<T: CacheValue>(&self, logical: &str) -> Result<CacheKey, Error> {
        if logical.trim().is_empty() {
            return Err(Error::caused_by(ErrorKind::InvalidKey, "logical key must not be empty"));
        }
        Ok(CacheKey(format!("{}:{}:{logical}", self.namespace, T::type_tag())))
    }
}
