//! Race session state

use std::sync::Arc;

use parking_lot::Mutex;

use slotrace_core::{Driver, LapRecord, RaceError, RacePhase, SlotResult};

/// State of one in-progress race
///
/// Owned exclusively by the race worker from start until a terminal phase.
/// Nothing here is persisted; completed laps are aggregated into the
/// leaderboard as they happen.
#[derive(Clone, Debug)]
pub struct RaceSession {
    driver: Driver,
    laps_target: u32,
    laps_completed: Vec<LapRecord>,
    early_start: bool,
    disqualified: bool,
    phase: RacePhase,
}

impl RaceSession {
    pub fn new(driver: Driver, laps_target: u32) -> SlotResult<Self> {
        if laps_target == 0 {
            return Err(RaceError::InvalidInput("lap count must be greater than zero".into()));
        }

        Ok(RaceSession {
            driver,
            laps_target,
            laps_completed: Vec::new(),
            early_start: false,
            disqualified: false,
            phase: RacePhase::Idle,
        })
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn laps_target(&self) -> u32 {
        self.laps_target
    }

    pub fn laps(&self) -> &[LapRecord] {
        &self.laps_completed
    }

    pub fn laps_completed(&self) -> u32 {
        self.laps_completed.len() as u32
    }

    pub fn early_start(&self) -> bool {
        self.early_start
    }

    pub fn disqualified(&self) -> bool {
        self.disqualified
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.laps_completed() >= self.laps_target
    }

    pub(crate) fn set_phase(&mut self, phase: RacePhase) {
        self.phase = phase;
    }

    pub(crate) fn mark_early_start(&mut self) {
        self.early_start = true;
    }

    pub(crate) fn mark_disqualified(&mut self) {
        self.disqualified = true;
    }

    /// Append a completed lap; laps beyond the target are dropped
    pub(crate) fn record_lap(&mut self, lap: LapRecord) -> bool {
        if self.is_complete() {
            return false;
        }
        self.laps_completed.push(lap);
        true
    }

    /// Fastest lap of this session, in seconds
    pub fn best_lap(&self) -> Option<f64> {
        self.laps_completed
            .iter()
            .map(|l| l.duration)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Most recent lap of this session, in seconds
    pub fn last_lap(&self) -> Option<f64> {
        self.laps_completed.last().map(|l| l.duration)
    }
}

/// Race phase shared between the controller and the race worker
#[derive(Clone, Debug, Default)]
pub struct PhaseCell(Arc<Mutex<RacePhase>>);

impl PhaseCell {
    pub fn get(&self) -> RacePhase {
        *self.0.lock()
    }

    pub fn set(&self, phase: RacePhase) {
        *self.0.lock() = phase;
    }
}
