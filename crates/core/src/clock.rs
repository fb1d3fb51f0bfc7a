// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic time source behind the rate limiters.
//!
//! Token-bucket refill credits tokens for elapsed time, so where
//! "now" comes from is injectable: production reads the process
//! monotonic clock, tests drive a shared manual timeline and check
//! refill math without real sleeping. Wall-clock timestamps (request
//! log, info file) are not this trait's concern.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Elapsed time since `earlier`; zero when `earlier` is in the
    /// future.
    fn since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

/// The process monotonic clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven clock for bucket tests.
///
/// Clones share one timeline, so advancing any handle is visible to a
/// bucket shared across tasks. Time only moves through
/// [`FakeClock::advance`].
#[derive(Clone, Debug)]
pub struct FakeClock {
    timeline: Arc<Mutex<Instant>>,
}

impl FakeClock {
    /// A timeline anchored at the moment of creation.
    pub fn new() -> Self {
        Self { timeline: Arc::new(Mutex::new(Instant::now())) }
    }

    /// Move the timeline forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.timeline.lock() += by;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.timeline.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
