//! Time sources for task readiness.
//!
//! Readiness times are expressed as a [`Duration`] since the clock's origin.
//! A [`SystemClock`] follows the monotonic wall clock; a [`VirtualClock`] only
//! moves when told to, which makes timer ordering reproducible in tests.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// A monotonic time source.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Whether waiting on this clock means jumping forward instead of blocking.
    fn is_virtual(&self) -> bool {
        false
    }

    /// Moves a virtual clock forward to `deadline`. Real clocks ignore this.
    fn advance_to(&self, _deadline: Duration) {}
}

/// Monotonic wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually driven clock.
///
/// Time never moves backwards: `set` and `advance_to` with an earlier time
/// are ignored.
///
/// ```
/// use event_runtime::{Clock, VirtualClock};
/// use std::time::Duration;
///
/// let clock = VirtualClock::new();
/// clock.advance(Duration::from_millis(500));
/// clock.set(Duration::from_millis(100));
/// assert_eq!(clock.now(), Duration::from_millis(500));
/// ```
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Cell<Duration>,
}

impl VirtualClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
    }

    /// Moves the clock to `now` if that is later than the current time.
    pub fn set(&self, now: Duration) {
        if now > self.now.get() {
            self.now.set(now);
        }
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn advance_to(&self, deadline: Duration) {
        self.set(deadline);
    }
}
