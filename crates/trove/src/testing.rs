// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test helpers: log capture and the failure-injecting mock tier.

use std::{
    io::Write,
    sync::{Arc, Mutex, PoisonError},
};

use tracing_subscriber::fmt::MakeWriter;
#[doc(inline)]
pub use trove_tier::testing::{MockTier, TierOp};

/// Captures formatted `tracing` output into a shared buffer.
///
/// Install [`subscriber`](Self::subscriber) with `tracing::subscriber::set_default`
/// to capture the current thread's events.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Creates an empty capture buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything captured so far.
    #[must_use]
    pub fn output(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Panics unless the captured output contains `expected`.
    #[expect(clippy::panic, reason = "test assertion helper")]
    pub fn assert_contains(&self, expected: &str) {
        let output = self.output();
        if !output.contains(expected) {
            panic!("log output does not contain '{expected}', got:\n{output}");
        }
    }

    /// Creates a subscriber writing every event, at every level, into this buffer.
    #[must_use]
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + use<> {
        use tracing_subscriber::layer::SubscriberExt;
        tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_writer(self.clone()).with_ansi(false))
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

/// Writer appending to a [`LogCapture`] buffer.
#[derive(Debug)]
pub struct LogCaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(all(test, feature = "metrics"))]
pub(crate) use metric_tester::MetricTester;
