//! Time primitives for race timing
//!
//! All race timestamps are taken from a single monotonic clock and stored as
//! microseconds since that clock's epoch. Durations derived from them keep
//! full precision; display rounds to milliseconds.

use std::ops::{Add, Sub};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Race time - monotonic, microseconds since clock epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaceTime(pub u64);

impl RaceTime {
    pub const ZERO: RaceTime = RaceTime(0);

    #[inline]
    pub fn from_micros(micros: u64) -> Self {
        RaceTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        RaceTime(millis * 1000)
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        RaceTime((secs.max(0.0) * 1_000_000.0).round() as u64)
    }

    #[inline]
    pub fn as_micros(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        RaceTime(self.0.saturating_add(duration.as_micros() as u64))
    }

    /// Seconds elapsed since `earlier`, zero if `earlier` is in the future
    #[inline]
    pub fn secs_since(self, earlier: RaceTime) -> f64 {
        (self - earlier).as_secs_f64()
    }
}

impl Add<Duration> for RaceTime {
    type Output = RaceTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<RaceTime> for RaceTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: RaceTime) -> Self::Output {
        Duration::from_micros(self.0.saturating_sub(rhs.0))
    }
}

impl std::fmt::Debug for RaceTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({:.3}s)", self.as_secs_f64())
    }
}

/// Format a lap time in seconds for display (3 decimal places)
pub fn format_seconds(secs: f64) -> String {
    format!("{:.3}", secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_time_subtraction_saturates() {
        let a = RaceTime::from_millis(1500);
        let b = RaceTime::from_millis(2000);
        assert_eq!(b - a, Duration::from_millis(500));
        assert_eq!(a - b, Duration::ZERO);
    }

    #[test]
    fn test_secs_since_keeps_micro_precision() {
        let start = RaceTime::from_secs_f64(1.0);
        let end = RaceTime::from_micros(2_500_001);
        assert!((end.secs_since(start) - 1.500001).abs() < 1e-9);
    }

    #[test]
    fn test_format_seconds_rounds_to_millis() {
        assert_eq!(format_seconds(10.2), "10.200");
        assert_eq!(format_seconds(7.12345), "7.123");
        assert_eq!(format_seconds(7.1236), "7.124");
    }

    proptest::proptest! {
        #[test]
        fn prop_secs_since_is_never_negative(a in 0u64..u64::MAX / 2, b in 0u64..u64::MAX / 2) {
            let elapsed = RaceTime(a).secs_since(RaceTime(b));
            proptest::prop_assert!(elapsed >= 0.0);
        }

        #[test]
        fn prop_add_then_sub_roundtrips(start in 0u64..1_000_000_000, micros in 0u64..1_000_000_000) {
            let t = RaceTime(start) + Duration::from_micros(micros);
            proptest::prop_assert_eq!(t - RaceTime(start), Duration::from_micros(micros));
        }
    }
}
