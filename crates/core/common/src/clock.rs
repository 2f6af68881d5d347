//! Time sources

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::time::UnixNanos;

/// Source of the current time for engines and emulators
pub trait Clock: Send + Sync {
    /// Current time in nanoseconds since the epoch
    fn timestamp_ns(&self) -> UnixNanos;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveClock;

impl Clock for LiveClock {
    fn timestamp_ns(&self) -> UnixNanos {
        UnixNanos::now()
    }
}

/// Manually driven clock for tests and simulation.
///
/// Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct TestClock {
    now: Arc<AtomicU64>,
}

impl TestClock {
    /// Creates a clock fixed at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time
    pub fn set_time(&self, ts: UnixNanos) {
        self.now.store(ts.as_u64(), Ordering::Release);
    }

    /// Moves the clock forward by `nanos`
    pub fn advance(&self, nanos: u64) {
        self.now.fetch_add(nanos, Ordering::AcqRel);
    }
}

impl Clock for TestClock {
    fn timestamp_ns(&self) -> UnixNanos {
        UnixNanos::from(self.now.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_shared_between_clones() {
        let clock = TestClock::new();
        let other = clock.clone();
        clock.set_time(UnixNanos::from(10));
        other.advance(5);
        assert_eq!(clock.timestamp_ns(), UnixNanos::from(15));
    }

    #[test]
    fn test_live_clock_is_nonzero() {
        assert!(!LiveClock.timestamp_ns().is_zero());
    }
}
