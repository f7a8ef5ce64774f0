// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Field and attribute keys shared by tier events and metrics.

#[cfg(any(feature = "metrics", test))]
pub(crate) const TIER: &str = "trove.tier";

#[cfg(any(feature = "metrics", test))]
pub(crate) const OPERATION: &str = "trove.operation";

#[cfg(any(feature = "metrics", test))]
pub(crate) const ACTIVITY: &str = "trove.activity";

#[cfg(test)]
pub(crate) const ELAPSED: &str = "trove.elapsed_ns";

#[cfg(test)]
pub(crate) const EVENT: &str = "tier operation";
