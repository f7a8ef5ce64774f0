// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! OpenTelemetry instruments for tier operations.

use opentelemetry::{
    InstrumentationScope,
    metrics::{Counter, Gauge, Histogram, Meter, MeterProvider},
};

const SCOPE: &str = "trove";
const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";

const EVENTS: &str = "trove.tier.events";
const DURATION: &str = "trove.tier.duration";
const ENTRIES: &str = "trove.tier.entries";

pub(crate) fn meter(provider: &dyn MeterProvider) -> Meter {
    let scope = InstrumentationScope::builder(SCOPE)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(SCHEMA_URL)
        .build();
    provider.meter_with_scope(scope)
}

/// One increment per recorded tier operation.
pub(crate) fn event_counter(meter: &Meter) -> Counter<u64> {
    meter
        .u64_counter(EVENTS)
        .with_description("Tier operations by outcome")
        .with_unit("{operation}")
        .build()
}

pub(crate) fn duration_histogram(meter: &Meter) -> Histogram<f64> {
    meter.f64_histogram(DURATION).with_description("Time spent in a tier call").with_unit("s").build()
}

pub(crate) fn size_gauge(meter: &Meter) -> Gauge<u64> {
    meter
        .u64_gauge(ENTRIES)
        .with_description("Entries resident in the local tier")
        .with_unit("{entry}")
        .build()
}
