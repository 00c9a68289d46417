// SPDX-License-Identifier: MIT
//
// Clock: the time source for frame pacing.
//
// The scheduler reads the time at the start and end of every tick and sleeps
// off whatever is left of the frame budget. Routing both through a trait lets
// tests drive the loop with simulated time.

use std::time::{Duration, Instant};

/// Monotonic time plus a blocking sleep.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Wall-clock time via [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
