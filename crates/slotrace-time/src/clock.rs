//! Clock implementations for race timing

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use slotrace_core::RaceTime;

/// Source of race timestamps and tick pacing
///
/// INVARIANT: `now()` is monotonically non-decreasing.
pub trait Clock: Send + Sync {
    /// Current race time
    fn now(&self) -> RaceTime;

    /// Wait for one scheduler tick of `duration`
    fn sleep(&self, duration: Duration);
}

/// Monotonic clock backed by the OS
pub struct MonotonicClock {
    /// Epoch of this clock
    reference: Instant,
}

impl MonotonicClock {
    /// Create a clock whose epoch is now
    pub fn new() -> Self {
        MonotonicClock {
            reference: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> RaceTime {
        RaceTime::from_micros(self.reference.elapsed().as_micros() as u64)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Manually driven clock for deterministic simulation
///
/// `sleep` advances the clock instead of blocking, so a five second
/// countdown runs in microseconds of real time.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    /// Create a manual clock starting at zero
    pub fn new() -> Self {
        ManualClock::default()
    }

    /// Create a manual clock starting at `t`
    pub fn starting_at(t: RaceTime) -> Self {
        ManualClock {
            micros: AtomicU64::new(t.as_micros()),
        }
    }

    /// Advance the clock by `duration`
    pub fn advance(&self, duration: Duration) -> RaceTime {
        let delta = duration.as_micros() as u64;
        let prev = self.micros.fetch_add(delta, Ordering::SeqCst);
        RaceTime::from_micros(prev + delta)
    }

    /// Move the clock forward to `target`; never moves backwards
    pub fn advance_to(&self, target: RaceTime) {
        self.micros.fetch_max(target.as_micros(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> RaceTime {
        RaceTime::from_micros(self.micros.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        // Let operator threads observe progress during long simulated waits
        std::thread::yield_now();
    }
}
