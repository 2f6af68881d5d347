//! Nanosecond timestamps

use std::{
    fmt,
    ops::{Add, Sub},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Nanoseconds per second
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Nanoseconds per millisecond
pub const NANOS_PER_MILLI: u64 = 1_000_000;

/// Nanoseconds since the UNIX epoch
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnixNanos(u64);

impl UnixNanos {
    /// Wraps a raw nanosecond count
    #[must_use]
    pub const fn new(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Current wall-clock time
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_nanos() as u64;
        Self(nanos)
    }

    /// Raw nanosecond count
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Seconds as floating point
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / NANOS_PER_SECOND as f64
    }

    /// Returns true for the zero timestamp
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// UTC date-time for display and logging
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.0 as i64)
    }

    /// Saturating difference in nanoseconds
    #[must_use]
    pub const fn saturating_sub_ns(&self, rhs: u64) -> Self {
        Self(self.0.saturating_sub(rhs))
    }
}

impl From<u64> for UnixNanos {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<UnixNanos> for u64 {
    fn from(value: UnixNanos) -> Self {
        value.0
    }
}

impl Add<u64> for UnixNanos {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub for UnixNanos {
    type Output = u64;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

impl fmt::Display for UnixNanos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let ts = UnixNanos::from(1_000);
        assert_eq!((ts + 500).as_u64(), 1_500);
        assert_eq!(UnixNanos::from(1_500) - ts, 500);
        assert_eq!(ts - UnixNanos::from(2_000), 0);
    }

    #[test]
    fn test_datetime() {
        let ts = UnixNanos::from(NANOS_PER_SECOND);
        assert_eq!(ts.to_datetime_utc().timestamp(), 1);
        assert!((ts.as_secs_f64() - 1.0).abs() < f64::EPSILON);
    }
}
