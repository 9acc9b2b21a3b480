//! Lap timer for single start/finish line crossings
//!
//! Converts the sensor's pulse stream into lap boundaries for exactly one
//! race session. A new session needs a new timer.
//!
//! ## Start modes
//!
//! - Green flag (`count_first_pulse = false`): no crossing has happened yet,
//!   so the first pulse arms the clock (`t0`) and completes nothing.
//! - Early start (`count_first_pulse = true`): the pulse that triggered the
//!   early start already crossed the line, so `t0` is the moment the
//!   session entered racing and the first pulse completes lap 1.
//!
//! Penalties are not applied here; the race state machine adds them to the
//! records this timer produces.

use slotrace_core::{LapRecord, RaceError, RaceTime, SlotResult};

/// Lap timer state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LapTimerState {
    /// Waiting for the first crossing to start lap 1
    Armed,
    /// A lap is open
    Timing,
    /// Target reached; further pulses are ignored
    Complete,
}

/// Lap timer for one race session
#[derive(Clone, Debug)]
pub struct LapTimer {
    laps_target: u32,
    count_first_pulse: bool,
    state: LapTimerState,
    /// Start of the currently open lap
    boundary: Option<RaceTime>,
    laps_completed: u32,
}

impl LapTimer {
    /// Create a timer for `laps_target` laps
    ///
    /// `racing_since` is the moment the session entered racing; it is only
    /// used as `t0` when `count_first_pulse` is set.
    pub fn new(laps_target: u32, count_first_pulse: bool, racing_since: RaceTime) -> SlotResult<Self> {
        if laps_target == 0 {
            return Err(RaceError::InvalidInput("lap count must be greater than zero".into()));
        }

        let (state, boundary) = if count_first_pulse {
            (LapTimerState::Timing, Some(racing_since))
        } else {
            (LapTimerState::Armed, None)
        };

        Ok(LapTimer {
            laps_target,
            count_first_pulse,
            state,
            boundary,
            laps_completed: 0,
        })
    }

    /// Feed one sensor pulse observed at `at`
    ///
    /// Returns the completed lap, if this pulse closed one.
    pub fn on_pulse(&mut self, at: RaceTime) -> Option<LapRecord> {
        match self.state {
            LapTimerState::Complete => None,
            LapTimerState::Armed => {
                self.boundary = Some(at);
                self.state = LapTimerState::Timing;
                None
            }
            LapTimerState::Timing => {
                let start = self.boundary.unwrap_or(at);
                let lap = LapRecord::new(self.laps_completed, start, at);

                self.laps_completed += 1;
                self.boundary = Some(at);
                if self.laps_completed >= self.laps_target {
                    self.state = LapTimerState::Complete;
                }
                Some(lap)
            }
        }
    }

    /// Turn a pulse stream into the lazy sequence of completed laps
    ///
    /// Consumes the timer: the sequence cannot be restarted.
    pub fn laps<I>(self, pulses: I) -> Laps<I::IntoIter>
    where
        I: IntoIterator<Item = RaceTime>,
    {
        Laps {
            timer: self,
            pulses: pulses.into_iter(),
        }
    }

    pub fn state(&self) -> LapTimerState {
        self.state
    }

    pub fn laps_target(&self) -> u32 {
        self.laps_target
    }

    pub fn laps_completed(&self) -> u32 {
        self.laps_completed
    }

    pub fn count_first_pulse(&self) -> bool {
        self.count_first_pulse
    }

    pub fn is_complete(&self) -> bool {
        self.state == LapTimerState::Complete
    }

    /// Start of the lap currently being timed, if any
    pub fn current_lap_start(&self) -> Option<RaceTime> {
        match self.state {
            LapTimerState::Timing => self.boundary,
            _ => None,
        }
    }
}

/// Lazy, finite sequence of laps produced from a pulse stream
pub struct Laps<I> {
    timer: LapTimer,
    pulses: I,
}

impl<I> Laps<I> {
    pub fn timer(&self) -> &LapTimer {
        &self.timer
    }
}

impl<I> Iterator for Laps<I>
where
    I: Iterator<Item = RaceTime>,
{
    type Item = LapRecord;

    fn next(&mut self) -> Option<LapRecord> {
        while !self.timer.is_complete() {
            let at = self.pulses.next()?;
            if let Some(lap) = self.timer.on_pulse(at) {
                return Some(lap);
            }
        }
        None
    }
}
