// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use tick::Clock;

/// Output of a future together with how long it took on the cache clock.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timed<R> {
    pub value: R,
    pub elapsed: Duration,
}

pub(crate) trait ClockExt {
    fn measure<F>(&self, future: F) -> impl Future<Output = Timed<F::Output>>
    where
        F: Future;
}

impl ClockExt for Clock {
    async fn measure<F>(&self, future: F) -> Timed<F::Output>
    where
        F: Future,
    {
        let started = self.instant();
        let value = future.await;
        let elapsed = self.instant().saturating_duration_since(started);
        Timed { value, elapsed }
    }
}
