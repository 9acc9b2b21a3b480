//! Race simulator
//!
//! Wires a `RaceController` to a `ManualClock` and a `ScriptedPort` over a
//! throwaway data directory. The race worker advances simulated time
//! itself, so a full countdown and race run in a fraction of a real second
//! and every timestamp is exact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use slotrace_core::{RaceEvent, RaceOutcome};
use slotrace_runtime::{ControllerConfig, EventReceiver, RaceController};
use slotrace_store::Stores;
use slotrace_time::{Clock, ManualClock};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::ScriptedPort;

/// Fresh, not yet existing directory under the OS temp dir
pub fn temp_data_dir() -> PathBuf {
    let suffix: u64 = rand::thread_rng().gen();
    std::env::temp_dir().join(format!("slotrace-sim-{suffix:016x}"))
}

/// Deterministic race rig
pub struct RaceSimulator {
    controller: RaceController,
    clock: Arc<ManualClock>,
    port: ScriptedPort,
    events: EventReceiver,
    data_dir: PathBuf,
    remove_data_dir: bool,
}

impl RaceSimulator {
    /// Simulator with default timing (5 s countdown, 10 ms ticks)
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    /// Simulator with custom timing; `data_dir` is replaced by a temp dir
    pub fn with_config(mut config: ControllerConfig) -> Self {
        let data_dir = temp_data_dir();
        config.data_dir = data_dir.clone();
        Self::in_dir(config)
    }

    /// Simulator over `config.data_dir`, which is removed on drop
    pub fn in_dir(config: ControllerConfig) -> Self {
        let data_dir = config.data_dir.clone();
        let clock = Arc::new(ManualClock::new());
        let port = ScriptedPort::new(clock.clone());
        let stores = Stores::open(&data_dir);
        let controller = RaceController::with_parts(config, stores, Arc::new(port.opener()), clock.clone());
        let events = controller.subscribe();
        debug!(dir = %data_dir.display(), "race simulator ready");

        RaceSimulator {
            controller,
            clock,
            port,
            events,
            data_dir,
            remove_data_dir: true,
        }
    }

    pub fn controller(&self) -> &RaceController {
        &self.controller
    }

    pub fn port(&self) -> &ScriptedPort {
        &self.port
    }

    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Leave the data directory in place when the simulator is dropped
    pub fn keep_data_dir(&mut self) {
        self.remove_data_dir = false;
    }

    /// Simulated seconds since the rig was built
    pub fn now_secs(&self) -> f64 {
        self.clock.now().as_secs_f64()
    }

    /// Block for the next event; `None` once the bus is gone
    pub fn next_event(&mut self) -> Option<RaceEvent> {
        loop {
            match self.events.blocking_recv() {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "simulator lagged"),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Block until an event matching `pred` arrives and return it
    pub fn wait_for(&mut self, pred: impl Fn(&RaceEvent) -> bool) -> Option<RaceEvent> {
        while let Some(event) = self.next_event() {
            if pred(&event) {
                return Some(event);
            }
        }
        None
    }

    /// Events published so far and not yet consumed
    pub fn drain_events(&mut self) -> Vec<RaceEvent> {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => return events,
            }
        }
    }

    /// Start a race and block until it ends
    pub fn run_race(&mut self, driver: &str, laps: u32) -> Option<RaceOutcome> {
        self.controller.start_race(driver, laps).ok()?;
        self.controller.wait_idle()
    }
}

impl Default for RaceSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RaceSimulator {
    fn drop(&mut self) {
        self.controller.disqualify();
        self.controller.wait_idle();
        if self.remove_data_dir {
            let _ = std::fs::remove_dir_all(&self.data_dir);
        }
    }
}
