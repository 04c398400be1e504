//! Fixed-point stream time.
//!
//! Recordings express every timestamp as unsigned 32.32 fixed-point seconds:
//! the upper 32 bits hold whole seconds, the lower 32 bits the fraction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// One second in raw fixed-point units.
const ONE_SECOND: u64 = 1 << 32;

/// A point in time (or a duration) in 32.32 fixed-point seconds.
///
/// Two values have special meaning:
/// - [`Time::MIN`] is zero, used as the "empty" value (e.g. the duration of a
///   stream without buffers).
/// - [`Time::MAX`] marks a time that was never set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(u64);

impl Time {
    /// The smallest representable time, also used as "empty".
    pub const MIN: Self = Self(0);

    /// The largest representable time, used as "never set".
    pub const MAX: Self = Self(u64::MAX);

    /// Zero seconds.
    pub const ZERO: Self = Self(0);

    /// Create a time from its raw fixed-point representation.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw fixed-point representation.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Create from whole seconds.
    pub const fn from_secs(secs: u32) -> Self {
        Self((secs as u64) << 32)
    }

    /// Create from fractional seconds. Negative values clamp to zero.
    pub fn from_seconds(seconds: f64) -> Self {
        if seconds <= 0.0 {
            return Self::MIN;
        }
        Self((seconds * ONE_SECOND as f64) as u64)
    }

    /// Create from milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Self(((millis as u128 * ONE_SECOND as u128) / 1000) as u64)
    }

    /// Time at which sample `count` starts for a given sampling rate.
    ///
    /// A zero sampling rate yields [`Time::MIN`].
    pub fn from_sample_count(sampling_rate: u64, count: u64) -> Self {
        if sampling_rate == 0 {
            return Self::MIN;
        }
        Self(((count as u128 * ONE_SECOND as u128) / sampling_rate as u128) as u64)
    }

    /// Convert to fractional seconds.
    pub fn to_seconds(self) -> f64 {
        self.0 as f64 / ONE_SECOND as f64
    }

    /// Convert to whole milliseconds (rounded to nearest).
    pub fn to_millis(self) -> u64 {
        ((self.0 as u128 * 1000 + (ONE_SECOND as u128 / 2)) / ONE_SECOND as u128) as u64
    }

    /// Check whether this time was ever set.
    pub fn is_set(self) -> bool {
        self != Self::MAX
    }

    /// Add a duration, saturating at [`Time::MAX`].
    pub fn saturating_add(self, other: Time) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtract, saturating at [`Time::MIN`].
    pub fn saturating_sub(self, other: Time) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        *self = self.saturating_add(rhs);
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        self.saturating_sub(rhs)
    }
}

impl From<u64> for Time {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Time> for u64 {
    fn from(time: Time) -> Self {
        time.0
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_set() {
            return write!(f, "unset");
        }
        write!(f, "{:.3}s", self.to_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_seconds() {
        assert_eq!(Time::from_secs(5).raw(), 5u64 << 32);
        assert_eq!(Time::from_seconds(5.0), Time::from_secs(5));
        assert_eq!(Time::from_secs(3).to_seconds(), 3.0);
    }

    #[test]
    fn test_millis() {
        let t = Time::from_millis(1500);
        assert_eq!(t.to_millis(), 1500);
        assert!((t.to_seconds() - 1.5).abs() < 1e-9);
        assert_eq!(Time::from_millis(1000), Time::from_secs(1));
    }

    #[test]
    fn test_sample_count() {
        assert_eq!(Time::from_sample_count(512, 512), Time::from_secs(1));
        assert_eq!(Time::from_sample_count(256, 32).to_millis(), 125);
        assert_eq!(Time::from_sample_count(0, 32), Time::MIN);
    }

    #[test]
    fn test_saturation() {
        assert_eq!(Time::MAX + Time::from_secs(1), Time::MAX);
        assert_eq!(Time::from_secs(1) - Time::from_secs(2), Time::MIN);
    }

    #[test]
    fn test_sentinels() {
        assert!(!Time::MAX.is_set());
        assert!(Time::MIN.is_set());
        assert_eq!(Time::MAX.to_string(), "unset");
        assert_eq!(Time::from_millis(250).to_string(), "0.250s");
    }
}
