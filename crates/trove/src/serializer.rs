// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! JSON payload encoding shared by both tiers.

use crate::{CacheValue, Error, ErrorKind};

/// Serializes `value` to the text stored in the tiers.
///
/// # Errors
///
/// Returns [`ErrorKind::Serialization`] if `serde_json` rejects the value, for
/// example a map with non-string keys.
pub fn encode<T: CacheValue>(value: &T) -> Result<String, Error> {
    serde_json::to_string(value).map_err(|e| Error::caused_by(ErrorKind::Serialization, e))
}

/// Parses a stored payload back into `T`.
///
/// # Errors
///
/// Returns [`ErrorKind::Serialization`] if the payload does not describe a `T`.
/// The cache treats this as a miss.
pub fn decode<T: CacheValue>(payload: &str) -> Result<T, Error> {
    serde_json::from_str(payload).map_err(|e| Error::caused_by(ErrorKind::Serialization, e))
}
