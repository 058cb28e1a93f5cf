//! Monotonic time sources for interval measurement
//!
//! The engine never reads wall-clock time directly; it asks an injected
//! `Clock` for the elapsed duration since an arbitrary fixed origin and works
//! with differences between successive readings. This keeps the attribution
//! logic deterministic under test and lets recorded streams be replayed with
//! their original timestamps.

use std::time::{Duration, Instant};

/// Monotonic timestamp source.
///
/// Readings are durations since an arbitrary origin chosen by the
/// implementation. Successive readings must be non-decreasing.
pub trait Clock {
    fn now(&mut self) -> Duration;
}

/// Production clock backed by `std::time::Instant`.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&mut self) -> Duration {
        self.origin.elapsed()
    }
}

/// Explicitly advanced clock for tests and recorded-stream replay.
///
/// The driver sets the clock to each recorded event's timestamp before
/// dispatching it; readings between adjustments are constant.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&mut self, delta: Duration) {
        self.now += delta;
    }

    /// Set the clock to an absolute reading in nanoseconds.
    ///
    /// Readings must not move backwards; a smaller value than the current
    /// reading is ignored to preserve monotonicity.
    pub fn set_ns(&mut self, at_ns: u64) {
        let at = Duration::from_nanos(at_ns);
        if at > self.now {
            self.now = at;
        }
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> Duration {
        self.now
    }
}
