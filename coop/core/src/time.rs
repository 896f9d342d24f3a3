//! Millisecond time model shared across the scheduler.
//!
//! The engine never reads a clock itself; hosts report time as [`Timestamp`]
//! values and the arithmetic here keeps the deadline math in one place. Both
//! types are signed so that already-expired deadlines (produced by negative
//! timeouts) need no special casing.

use core::fmt;
use core::ops::{Add, AddAssign, Sub, SubAssign};

/// A point in time reported by the host clock, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(i64);

impl Timestamp {
    /// The host clock's origin.
    pub const ZERO: Self = Self(0);

    /// Create a timestamp from a millisecond reading.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Get the raw millisecond reading.
    pub const fn as_millis(self) -> i64 {
        self.0
    }
}

impl Add<TimeDelta> for Timestamp {
    type Output = Timestamp;

    fn add(self, delta: TimeDelta) -> Timestamp {
        Timestamp(self.0.saturating_add(delta.0))
    }
}

impl AddAssign<TimeDelta> for Timestamp {
    fn add_assign(&mut self, delta: TimeDelta) {
        *self = *self + delta;
    }
}

impl Sub for Timestamp {
    type Output = TimeDelta;

    fn sub(self, earlier: Timestamp) -> TimeDelta {
        TimeDelta(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// A span of time in milliseconds; may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeDelta(i64);

impl TimeDelta {
    /// Zero-length span.
    pub const ZERO: Self = Self(0);

    /// Largest representable span.
    pub const MAX: Self = Self(i64::MAX);

    /// Create a span from milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Create a span from whole seconds.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * 1000)
    }

    /// Get the span in milliseconds.
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Check whether the span is negative.
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Clamp the span to zero or above.
    pub fn clamp_non_negative(self) -> Self {
        Self(self.0.max(0))
    }
}

impl Add for TimeDelta {
    type Output = TimeDelta;

    fn add(self, other: TimeDelta) -> TimeDelta {
        TimeDelta(self.0.saturating_add(other.0))
    }
}

impl Sub for TimeDelta {
    type Output = TimeDelta;

    fn sub(self, other: TimeDelta) -> TimeDelta {
        TimeDelta(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for TimeDelta {
    fn sub_assign(&mut self, other: TimeDelta) {
        *self = *self - other;
    }
}

impl fmt::Display for TimeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
