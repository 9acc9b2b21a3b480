//! Race scenarios
//!
//! A `RaceScenario` scripts one race end to end: the sensor timeline, an
//! optional unplug, an optional disqualification after a number of
//! committed laps. Running it on a fresh `RaceSimulator` yields a
//! `ScenarioReport` with the outcome, the laps the worker reported, the
//! committed leaderboard entry and every event observed.

use tracing::info;

use slotrace_core::{LapRecord, RaceEvent, RaceOutcome, RacePhase, RaceResult};
use slotrace_runtime::ControllerConfig;
use slotrace_time::CountdownConfig;

use crate::RaceSimulator;

/// Scripted race
#[derive(Clone, Debug)]
pub struct RaceScenario {
    pub name: &'static str,
    pub driver: String,
    pub laps: u32,
    /// Sensor crossings, in simulated seconds since the start request
    pub pulses: Vec<f64>,
    /// Sensor reads fail from this instant on
    pub fail_at: Option<f64>,
    /// Disqualify once this many laps are committed
    pub disqualify_after: Option<u32>,
    pub early_start_penalty: u32,
    pub countdown_secs: u64,
}

impl RaceScenario {
    pub fn new(name: &'static str, laps: u32, pulses: &[f64]) -> Self {
        RaceScenario {
            name,
            driver: "Jim".to_string(),
            laps,
            pulses: pulses.to_vec(),
            fail_at: None,
            disqualify_after: None,
            early_start_penalty: slotrace_core::DEFAULT_EARLY_START_PENALTY,
            countdown_secs: 5,
        }
    }

    pub fn with_fault_at(mut self, secs: f64) -> Self {
        self.fail_at = Some(secs);
        self
    }

    pub fn with_disqualify_after(mut self, laps: u32) -> Self {
        self.disqualify_after = Some(laps);
        self
    }

    pub fn with_penalty(mut self, seconds: u32) -> Self {
        self.early_start_penalty = seconds;
        self
    }

    /// Run on a fresh simulator
    pub fn run(&self) -> ScenarioReport {
        let config = ControllerConfig {
            countdown: CountdownConfig::seconds(self.countdown_secs),
            ..Default::default()
        };
        let mut sim = RaceSimulator::with_config(config);
        self.run_on(&mut sim)
    }

    /// Run on an existing simulator, adding the driver if needed
    pub fn run_on(&self, sim: &mut RaceSimulator) -> ScenarioReport {
        let controller = sim.controller();
        if !controller.stores().roster.contains(&self.driver) {
            let _ = controller.add_driver(&self.driver);
        }
        let _ = controller.set_early_start_penalty(self.early_start_penalty);

        // Script relative to the current simulated instant
        sim.drain_events();
        let base = sim.now_secs();
        sim.port().pulses_at(&self.pulses.iter().map(|t| base + t).collect::<Vec<_>>());
        if let Some(at) = self.fail_at {
            sim.port().fail_at(base + at);
        }

        let mut events = Vec::new();
        if let Err(error) = sim.controller().start_race(&self.driver, self.laps) {
            return ScenarioReport {
                name: self.name,
                start_error: Some(error),
                outcome: None,
                result: sim.controller().stores().leaderboard.get(&self.driver),
                events,
                port_released: !sim.port().is_held(),
            };
        }

        if let Some(target) = self.disqualify_after {
            let mut committed = 0;
            while committed < target {
                let Some(event) = sim.next_event() else { break };
                let ended = matches!(event, RaceEvent::SessionEnded { .. });
                if matches!(event, RaceEvent::ResultCommitted { .. } | RaceEvent::Fault { .. }) {
                    committed += 1;
                }
                events.push(event);
                if ended {
                    break;
                }
            }
            sim.controller().disqualify();
        }

        let outcome = sim.controller().wait_idle();
        events.extend(sim.drain_events());
        info!(scenario = self.name, outcome = ?outcome, "scenario complete");

        ScenarioReport {
            name: self.name,
            start_error: None,
            outcome,
            result: sim.controller().stores().leaderboard.get(&self.driver),
            events,
            port_released: !sim.port().is_held(),
        }
    }
}

/// What a scenario run produced
#[derive(Clone, Debug)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub start_error: Option<slotrace_core::RaceError>,
    pub outcome: Option<RaceOutcome>,
    /// Leaderboard entry of the driver after the race
    pub result: Option<RaceResult>,
    pub events: Vec<RaceEvent>,
    pub port_released: bool,
}

impl ScenarioReport {
    /// Laps in the order the worker reported them
    pub fn laps(&self) -> Vec<LapRecord> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RaceEvent::LapCompleted { lap, .. } => Some(lap.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn lap_durations(&self) -> Vec<f64> {
        self.laps().iter().map(|l| l.duration).collect()
    }

    pub fn phases(&self) -> Vec<RacePhase> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RaceEvent::PhaseChanged { phase } => Some(*phase),
                _ => None,
            })
            .collect()
    }

    pub fn countdown_ticks(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RaceEvent::CountdownTick { seconds_remaining } => Some(*seconds_remaining),
                _ => None,
            })
            .collect()
    }

    pub fn faults(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, RaceEvent::Fault { .. }))
            .count()
    }

    pub fn early_start(&self) -> bool {
        self.events.contains(&RaceEvent::Go { early_start: true })
    }

    /// The session ended and the sensor is free again
    pub fn passed(&self) -> bool {
        self.outcome.is_some() && self.port_released && self.phases().last() == Some(&RacePhase::Idle)
    }
}

/// Clean start, three laps of 2 s, 1 s and 2 s
pub fn green_flag_race() -> RaceScenario {
    RaceScenario::new("green_flag", 3, &[6.0, 8.0, 9.0, 11.0])
}

/// Jump start at 2 s; lap 1 runs 5 s raw and carries the penalty
pub fn early_start_race() -> RaceScenario {
    RaceScenario::new("early_start", 2, &[2.0, 7.0, 10.0])
}

/// Crossing on the very tick the countdown expires
pub fn start_line_photo_finish() -> RaceScenario {
    RaceScenario::new("photo_finish", 1, &[5.0, 7.5])
}

/// Five lap race stopped during lap 2
pub fn disqualified_mid_race() -> RaceScenario {
    RaceScenario::new("disqualified", 5, &[6.0, 8.0]).with_disqualify_after(1)
}

/// Sensor unplugged during lap 2
pub fn unplugged_sensor() -> RaceScenario {
    RaceScenario::new("unplugged", 3, &[6.0, 8.0]).with_fault_at(8.5)
}
