// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-operation telemetry for the cache tiers.
//!
//! Every tier call made by the service is recorded as a `(tier, operation,
//! activity)` triple. With logs enabled the triple is emitted as a `tracing`
//! event named `tier operation`; with the `metrics` feature and a meter provider it
//! also feeds OpenTelemetry instruments.
//!
//! Degradation warnings are not part of this: they are always logged.

use std::{sync::Arc, time::Duration};

#[cfg(feature = "metrics")]
use opentelemetry::{
    KeyValue,
    metrics::{Counter, Gauge, Histogram, Meter, MeterProvider},
};

pub(crate) mod attributes;
pub(crate) mod ext;
#[cfg(feature = "metrics")]
pub(crate) mod metrics;

/// Identifies a tier in telemetry output, such as `"local"` or `"distributed"`.
pub(crate) type TierName = &'static str;

/// Configuration for per-operation cache telemetry.
///
/// Everything is disabled by default.
///
/// # Examples
///
/// ```
/// use trove::TelemetryConfig;
///
/// let config = TelemetryConfig::new().with_logs();
/// # let _ = config;
/// ```
#[derive(Clone, Debug, Default)]
pub struct TelemetryConfig {
    logs_enabled: bool,
    #[cfg(feature = "metrics")]
    meter: Option<Meter>,
}

impl TelemetryConfig {
    /// Creates a configuration with logs and metrics disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a `tracing` event for every tier operation.
    #[must_use]
    pub fn with_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    /// Records OpenTelemetry metrics through `provider`.
    #[cfg(feature = "metrics")]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn with_metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.meter = Some(metrics::meter(provider));
        self
    }

    pub(crate) fn build(self) -> CacheTelemetry {
        CacheTelemetry {
            inner: Arc::new(TelemetryInner {
                logging_enabled: self.logs_enabled,
                #[cfg(feature = "metrics")]
                event_counter: self.meter.as_ref().map(metrics::event_counter),
                #[cfg(feature = "metrics")]
                operation_duration: self.meter.as_ref().map(metrics::duration_histogram),
                #[cfg(feature = "metrics")]
                cache_size: self.meter.as_ref().map(metrics::size_gauge),
            }),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct CacheTelemetry {
    inner: Arc<TelemetryInner>,
}

#[derive(Debug, Default)]
struct TelemetryInner {
    logging_enabled: bool,
    #[cfg(feature = "metrics")]
    event_counter: Option<Counter<u64>>,
    #[cfg(feature = "metrics")]
    operation_duration: Option<Histogram<f64>>,
    #[cfg(feature = "metrics")]
    cache_size: Option<Gauge<u64>>,
}

impl CacheTelemetry {
    pub(crate) fn record(&self, name: TierName, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        #[cfg(feature = "metrics")]
        {
            let attrs = [
                KeyValue::new(attributes::TIER, name),
                KeyValue::new(attributes::OPERATION, operation.as_str()),
                KeyValue::new(attributes::ACTIVITY, activity.as_str()),
            ];

            if let Some(c) = &self.inner.event_counter {
                c.add(1, &attrs);
            }

            if let (Some(d), Some(h)) = (duration, &self.inner.operation_duration) {
                h.record(d.as_secs_f64(), &attrs);
            }
        }

        if self.inner.logging_enabled {
            Self::emit(name, operation, activity, duration);
        }
    }

    #[cfg_attr(not(feature = "metrics"), expect(unused_variables, reason = "only metrics track size"))]
    pub(crate) fn record_size(&self, name: TierName, size: u64) {
        #[cfg(feature = "metrics")]
        if let Some(g) = &self.inner.cache_size {
            g.record(size, &[KeyValue::new(attributes::TIER, name)]);
        }
    }

    fn emit(name: TierName, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        let op = operation.as_str();
        let act = activity.as_str();
        let elapsed_ns = duration.map(|d| d.as_nanos());

        // The tracing level must be a constant, hence one call site per level.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    trove.tier = name,
                    trove.operation = op,
                    trove.activity = act,
                    trove.elapsed_ns = ?elapsed_ns,
                    "tier operation"
                )
            };
        }

        match activity.severity() {
            Severity::Error => emit_event!(error),
            Severity::Info => emit_event!(info),
            Severity::Debug => emit_event!(debug),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Insert,
    Invalidate,
    Clear,
    Ping,
    Compute,
}

impl CacheOperation {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Get => "tier.get",
            Self::Insert => "tier.insert",
            Self::Invalidate => "tier.invalidate",
            Self::Clear => "tier.clear",
            Self::Ping => "tier.ping",
            Self::Compute => "tier.compute",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    Expired,
    Miss,
    Inserted,
    Invalidated,
    Ok,
    Promoted,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Debug,
    Info,
    Error,
}

impl CacheActivity {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "tier.hit",
            Self::Expired => "tier.expired",
            Self::Miss => "tier.miss",
            Self::Inserted => "tier.inserted",
            Self::Invalidated => "tier.invalidated",
            Self::Ok => "tier.ok",
            Self::Promoted => "tier.promoted",
            Self::Error => "tier.error",
        }
    }

    pub(crate) fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::Miss | Self::Ok => Severity::Debug,
            Self::Expired | Self::Inserted | Self::Invalidated | Self::Promoted => Severity::Info,
            Self::Error => Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::LogCapture;

    #[test]
    fn operation_names() {
        assert_eq!(CacheOperation::Get.as_str(), "tier.get");
        assert_eq!(CacheOperation::Insert.as_str(), "tier.insert");
        assert_eq!(CacheOperation::Invalidate.as_str(), "tier.invalidate");
        assert_eq!(CacheOperation::Clear.as_str(), "tier.clear");
        assert_eq!(CacheOperation::Ping.as_str(), "tier.ping");
        assert_eq!(CacheOperation::Compute.as_str(), "tier.compute");
    }

    #[test]
    fn activity_severity() {
        assert_eq!(CacheActivity::Hit.severity(), Severity::Debug);
        assert_eq!(CacheActivity::Miss.severity(), Severity::Debug);
        assert_eq!(CacheActivity::Ok.severity(), Severity::Debug);
        assert_eq!(CacheActivity::Expired.severity(), Severity::Info);
        assert_eq!(CacheActivity::Promoted.severity(), Severity::Info);
        assert_eq!(CacheActivity::Error.severity(), Severity::Error);
    }

    #[test]
    fn emit_contains_all_fields() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        CacheTelemetry::emit(
            "distributed",
            CacheOperation::Invalidate,
            CacheActivity::Error,
            Some(Duration::from_nanos(12345)),
        );

        capture.assert_contains(attributes::TIER);
        capture.assert_contains(attributes::OPERATION);
        capture.assert_contains(attributes::ACTIVITY);
        capture.assert_contains(attributes::ELAPSED);
        capture.assert_contains(attributes::EVENT);
        capture.assert_contains("distributed");
        capture.assert_contains("tier.invalidate");
        capture.assert_contains("tier.error");
        capture.assert_contains("ERROR");
    }

    #[test]
    fn emit_levels_follow_severity() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        CacheTelemetry::emit("local", CacheOperation::Get, CacheActivity::Expired, None);
        capture.assert_contains("INFO");

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        CacheTelemetry::emit("local", CacheOperation::Get, CacheActivity::Hit, None);
        capture.assert_contains("DEBUG");
    }

    #[test]
    fn disabled_telemetry_is_silent() {
        let telemetry = TelemetryConfig::new().build();

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        telemetry.record("local", CacheOperation::Get, CacheActivity::Hit, Some(Duration::from_secs(1)));
        telemetry.record_size("local", 3);

        assert!(capture.output().is_empty());
    }

    #[test]
    fn enabled_logs_reach_subscriber() {
        let telemetry = TelemetryConfig::new().with_logs().build();

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        telemetry.record("local", CacheOperation::Insert, CacheActivity::Inserted, None);

        capture.assert_contains("tier.inserted");
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn metrics_carry_tier_operation_and_activity() {
        use crate::testing::MetricTester;

        let tester = MetricTester::new();
        let telemetry = TelemetryConfig::new().with_metrics(tester.meter_provider()).build();

        telemetry.record("local", CacheOperation::Get, CacheActivity::Hit, Some(Duration::from_millis(5)));
        telemetry.record_size("local", 7);

        tester.assert_attributes_contain(&[
            KeyValue::new(attributes::TIER, "local"),
            KeyValue::new(attributes::OPERATION, "tier.get"),
            KeyValue::new(attributes::ACTIVITY, "tier.hit"),
        ]);
    }
}
