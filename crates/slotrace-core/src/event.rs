//! Race phases, outcomes and observer events
//!
//! Observers (display, sound, export) never poll the race worker. They
//! receive `RaceEvent`s published on phase changes, countdown seconds,
//! lap completions and leaderboard commits.

use crate::{Driver, LapRecord, RaceError, RaceResult};

/// Race state machine phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RacePhase {
    /// No session; accepts a new start
    #[default]
    Idle,
    /// Countdown running, sensor polled every tick
    Countdown,
    /// Pulse seen before the countdown reached zero
    EarlyStart,
    /// Countdown reached zero without a pulse
    GreenFlag,
    /// Laps being timed
    Racing,
    /// All target laps completed
    Finished,
    /// Operator disqualified the driver
    Disqualified,
}

impl RacePhase {
    /// Whether a session is occupying the sensor and countdown
    #[inline]
    pub fn is_active(self) -> bool {
        self != RacePhase::Idle
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, RacePhase::Finished | RacePhase::Disqualified)
    }

    pub fn name(self) -> &'static str {
        match self {
            RacePhase::Idle => "idle",
            RacePhase::Countdown => "countdown",
            RacePhase::EarlyStart => "early-start",
            RacePhase::GreenFlag => "green-flag",
            RacePhase::Racing => "racing",
            RacePhase::Finished => "finished",
            RacePhase::Disqualified => "disqualified",
        }
    }
}

/// How a session ended
#[derive(Clone, Debug, PartialEq)]
pub enum RaceOutcome {
    /// Every target lap completed
    Finished {
        laps: u32,
        best_lap: f64,
        last_lap: f64,
    },
    /// Disqualified by the operator; completed laps stay committed
    Disqualified { laps_completed: u32 },
    /// Runtime fault (sensor lost); completed laps stay committed
    Aborted { error: RaceError },
}

impl RaceOutcome {
    pub fn laps_completed(&self) -> Option<u32> {
        match self {
            RaceOutcome::Finished { laps, .. } => Some(*laps),
            RaceOutcome::Disqualified { laps_completed } => Some(*laps_completed),
            RaceOutcome::Aborted { .. } => None,
        }
    }
}

/// Event published to observers
#[derive(Clone, Debug, PartialEq)]
pub enum RaceEvent {
    /// State machine entered a new phase
    PhaseChanged { phase: RacePhase },
    /// Whole seconds left in the countdown (5, 4, 3, 2, 1)
    CountdownTick { seconds_remaining: u32 },
    /// Race started, either on green flag or by an early start
    Go { early_start: bool },
    /// A lap was completed; `lap.duration` includes `penalty`
    LapCompleted {
        driver: Driver,
        lap: LapRecord,
        penalty: f64,
    },
    /// Leaderboard entry durably committed after a lap
    ResultCommitted { result: RaceResult },
    /// Runtime fault during a session
    Fault { error: RaceError },
    /// Session reached its end; the controller is idle again
    SessionEnded { driver: Driver, outcome: RaceOutcome },
}
