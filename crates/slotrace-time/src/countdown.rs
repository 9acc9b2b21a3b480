//! Countdown sequencing
//!
//! The countdown runs at tick resolution (10ms by default) so the sensor can
//! be polled for early starts between announcements, while observers only
//! hear about whole seconds.

use std::time::Duration;

/// Smallest tick the countdown accepts
const MIN_TICK: Duration = Duration::from_millis(1);

/// Countdown configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountdownConfig {
    /// Total countdown length
    pub duration: Duration,
    /// Scheduler tick; the sensor is polled once per tick
    pub tick_interval: Duration,
    /// Announcement granularity for observers
    pub display_interval: Duration,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        CountdownConfig {
            duration: Duration::from_secs(5),
            tick_interval: Duration::from_millis(10),
            display_interval: Duration::from_secs(1),
        }
    }
}

impl CountdownConfig {
    /// Default cadence with a custom length in whole seconds
    pub fn seconds(secs: u64) -> Self {
        CountdownConfig {
            duration: Duration::from_secs(secs),
            ..Self::default()
        }
    }
}

/// Result of advancing the countdown by one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownStep {
    /// Still counting, nothing to announce
    Running,
    /// A new whole display unit was entered
    Announce(u32),
    /// Countdown reached zero
    Expired,
}

/// Tick-driven countdown
#[derive(Clone, Debug)]
pub struct Countdown {
    tick_interval: Duration,
    display_interval: Duration,
    total_ticks: u64,
    elapsed_ticks: u64,
    last_announced: Option<u32>,
}

impl Countdown {
    pub fn new(config: &CountdownConfig) -> Self {
        let tick_interval = config.tick_interval.max(MIN_TICK);
        let tick_us = tick_interval.as_micros();
        let total_ticks = config.duration.as_micros().div_ceil(tick_us) as u64;

        Countdown {
            tick_interval,
            display_interval: config.display_interval.max(tick_interval),
            total_ticks,
            elapsed_ticks: 0,
            last_announced: None,
        }
    }

    /// Tick interval callers must wait between `advance` calls
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Time left before the countdown expires
    pub fn remaining(&self) -> Duration {
        let ticks = self.total_ticks.saturating_sub(self.elapsed_ticks);
        Duration::from_micros((self.tick_interval.as_micros() as u64).saturating_mul(ticks))
    }

    /// Display units left, rounded up (5 for the full default countdown)
    pub fn seconds_remaining(&self) -> u32 {
        let remaining = self.remaining().as_micros();
        remaining.div_ceil(self.display_interval.as_micros()) as u32
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed_ticks >= self.total_ticks
    }

    /// Announcement for the start of the countdown, before any tick
    pub fn begin(&mut self) -> Option<u32> {
        if self.is_expired() {
            return None;
        }
        let secs = self.seconds_remaining();
        self.last_announced = Some(secs);
        Some(secs)
    }

    /// Advance by one tick
    pub fn advance(&mut self) -> CountdownStep {
        if self.is_expired() {
            return CountdownStep::Expired;
        }

        self.elapsed_ticks += 1;
        if self.is_expired() {
            return CountdownStep::Expired;
        }

        let secs = self.seconds_remaining();
        if self.last_announced != Some(secs) {
            self.last_announced = Some(secs);
            CountdownStep::Announce(secs)
        } else {
            CountdownStep::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_expiry(countdown: &mut Countdown) -> (u64, Vec<u32>) {
        let mut ticks = 0;
        let mut announced = Vec::new();
        loop {
            ticks += 1;
            match countdown.advance() {
                CountdownStep::Running => {}
                CountdownStep::Announce(s) => announced.push(s),
                CountdownStep::Expired => return (ticks, announced),
            }
        }
    }

    #[test]
    fn test_default_countdown_announces_each_second() {
        let mut countdown = Countdown::new(&CountdownConfig::default());

        assert_eq!(countdown.begin(), Some(5));
        let (ticks, announced) = run_to_expiry(&mut countdown);

        assert_eq!(ticks, 500);
        assert_eq!(announced, vec![4, 3, 2, 1]);
        assert!(countdown.is_expired());
        assert_eq!(countdown.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_fractional_countdown_rounds_up() {
        let mut countdown = Countdown::new(&CountdownConfig {
            duration: Duration::from_millis(2500),
            ..CountdownConfig::default()
        });

        assert_eq!(countdown.begin(), Some(3));
        let (ticks, announced) = run_to_expiry(&mut countdown);

        assert_eq!(ticks, 250);
        assert_eq!(announced, vec![2, 1]);
    }

    #[test]
    fn test_zero_countdown_expires_immediately() {
        let mut countdown = Countdown::new(&CountdownConfig::seconds(0));

        assert_eq!(countdown.begin(), None);
        assert_eq!(countdown.advance(), CountdownStep::Expired);
        assert_eq!(countdown.advance(), CountdownStep::Expired);
    }

    #[test]
    fn test_zero_tick_is_clamped() {
        let countdown = Countdown::new(&CountdownConfig {
            duration: Duration::from_secs(1),
            tick_interval: Duration::ZERO,
            display_interval: Duration::from_secs(1),
        });

        assert_eq!(countdown.tick_interval(), MIN_TICK);
        assert_eq!(countdown.seconds_remaining(), 1);
    }
}
