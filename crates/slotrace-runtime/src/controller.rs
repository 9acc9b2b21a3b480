//! Operator-facing race controller
//!
//! `RaceController` owns the stores, the sensor opener, the clock and the
//! single active session slot. Validation happens on the caller's thread
//! and is reported synchronously; everything that happens once a race is
//! running is reported through the event bus.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{error, info, warn};

use slotrace_core::{Driver, ExportRow, RaceError, RaceOutcome, RacePhase, RaceResult, Settings, SlotResult};
use slotrace_sensor::{PortOpener, SensorConfig, SerialOpener};
use slotrace_store::Stores;
use slotrace_time::{Clock, CountdownConfig, MonotonicClock};

use crate::{
    EventBus, EventReceiver, MachineConfig, PhaseCell, RaceContext, RaceSession, RaceStateMachine,
    DEFAULT_EVENT_CAPACITY,
};

/// Controller configuration
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Directory holding the driver, result and settings files
    pub data_dir: PathBuf,
    pub countdown: CountdownConfig,
    pub sensor: SensorConfig,
    /// Sensor poll cadence while racing
    pub poll_interval: Duration,
    /// Buffered events per observer
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let countdown = CountdownConfig::default();
        ControllerConfig {
            data_dir: PathBuf::from("."),
            poll_interval: countdown.tick_interval,
            countdown,
            sensor: SensorConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ControllerConfig {
    /// Default configuration storing its files in `data_dir`
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        ControllerConfig {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }
}

/// The race worker currently (or most recently) owning the session slot
struct ActiveRace {
    driver: Driver,
    handle: JoinHandle<RaceOutcome>,
}

/// Owner of the stores and the single race session slot
pub struct RaceController {
    config: ControllerConfig,
    stores: Stores,
    opener: Arc<dyn PortOpener>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    disqualify: Arc<AtomicBool>,
    phase: PhaseCell,
    worker: Mutex<Option<ActiveRace>>,
}

impl RaceController {
    /// Controller reading a real serial port with the monotonic clock
    pub fn new(config: ControllerConfig) -> Self {
        let stores = Stores::open(&config.data_dir);
        Self::with_parts(config, stores, Arc::new(SerialOpener), Arc::new(MonotonicClock::new()))
    }

    /// Controller over explicit stores, sensor opener and clock
    pub fn with_parts(
        config: ControllerConfig,
        stores: Stores,
        opener: Arc<dyn PortOpener>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = EventBus::new(config.event_capacity);
        RaceController {
            config,
            stores,
            opener,
            clock,
            events,
            disqualify: Arc::new(AtomicBool::new(false)),
            phase: PhaseCell::default(),
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ---- roster ----

    pub fn add_driver(&self, name: &str) -> SlotResult<Driver> {
        self.stores.roster.add(name)
    }

    /// Remove a driver and their results; refused while they are racing
    pub fn remove_driver(&self, name: &str) -> SlotResult<bool> {
        // Held across the removal so a start for the same driver cannot interleave
        let slot = self.worker.lock();
        let racing = self.phase.get().is_active() && slot.as_ref().is_some_and(|race| race.driver == name);
        if racing {
            return Err(RaceError::SessionBusy);
        }
        self.stores.roster.remove(name)
    }

    pub fn list_drivers(&self) -> Vec<Driver> {
        self.stores.roster.list()
    }

    // ---- settings ----

    pub fn settings(&self) -> Settings {
        self.stores.settings.settings()
    }

    /// Takes effect from the next race
    pub fn set_serial_port(&self, port: &str) -> SlotResult<()> {
        self.stores.settings.set_serial_port(port)
    }

    /// Takes effect from the next race
    pub fn set_early_start_penalty(&self, seconds: u32) -> SlotResult<()> {
        self.stores.settings.set_early_start_penalty(seconds)
    }

    // ---- leaderboard ----

    pub fn ranked_results(&self) -> Vec<RaceResult> {
        self.stores.leaderboard.ranked_results()
    }

    pub fn export_results(&self) -> Vec<ExportRow> {
        self.stores.leaderboard.export_rows()
    }

    // ---- race ----

    /// Start a race for `driver` over `laps` laps
    ///
    /// Returns once the worker owns the session; the phase is already
    /// `Countdown` at that point. Sensor problems after this are reported
    /// as a `Fault` event and an `Aborted` outcome.
    pub fn start_race(&self, driver: &str, laps: u32) -> SlotResult<()> {
        if laps == 0 {
            return Err(RaceError::InvalidInput("lap count must be greater than zero".into()));
        }

        // Roster lookup under the slot lock pairs with `remove_driver`
        let mut slot = self.worker.lock();
        let driver = self
            .stores
            .roster
            .get(driver)
            .ok_or_else(|| RaceError::InvalidInput(format!("unknown driver: {driver}")))?;
        if self.phase.get().is_active() {
            return Err(RaceError::SessionBusy);
        }
        if let Some(previous) = slot.take() {
            Self::join(previous);
        }

        let session = RaceSession::new(driver.clone(), laps)?;
        let settings = self.settings();
        let machine_config = MachineConfig {
            port: settings.serial_port,
            sensor: self.config.sensor.clone(),
            countdown: self.config.countdown.clone(),
            early_start_penalty: settings.early_start_penalty as f64,
            poll_interval: self.config.poll_interval,
        };
        let ctx = RaceContext {
            opener: Arc::clone(&self.opener),
            clock: Arc::clone(&self.clock),
            leaderboard: Arc::clone(&self.stores.leaderboard),
            events: self.events.clone(),
            disqualify: Arc::clone(&self.disqualify),
            phase: self.phase.clone(),
        };
        let machine = RaceStateMachine::new(session, ctx, machine_config);

        // A flag raised while idle must not leak into this session
        self.disqualify.store(false, Ordering::SeqCst);
        self.phase.set(RacePhase::Countdown);

        let handle = thread::Builder::new()
            .name("race-worker".into())
            .spawn(move || machine.run())
            .map_err(|e| {
                self.phase.set(RacePhase::Idle);
                error!(error = %e, "failed to spawn race worker");
                RaceError::SessionBusy
            })?;

        info!(driver = %driver, laps, "race started");
        *slot = Some(ActiveRace { driver, handle });
        Ok(())
    }

    /// Ask the running race to stop as disqualified
    ///
    /// No-op when no race is active. Returns whether the request was raised.
    pub fn disqualify(&self) -> bool {
        if !self.phase.get().is_active() {
            return false;
        }
        self.disqualify.store(true, Ordering::SeqCst);
        info!("disqualification requested");
        true
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn phase(&self) -> RacePhase {
        self.phase.get()
    }

    pub fn is_racing(&self) -> bool {
        self.phase.get().is_active()
    }

    /// Driver of the race currently running, if any
    pub fn active_driver(&self) -> Option<Driver> {
        if !self.is_racing() {
            return None;
        }
        self.worker.lock().as_ref().map(|race| race.driver.clone())
    }

    /// Block until the current worker has finished
    ///
    /// Returns the outcome of the most recent race not yet collected.
    pub fn wait_idle(&self) -> Option<RaceOutcome> {
        let race = self.worker.lock().take()?;
        Self::join(race)
    }

    fn join(race: ActiveRace) -> Option<RaceOutcome> {
        match race.handle.join() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                error!(driver = %race.driver, "race worker panicked");
                None
            }
        }
    }
}

impl Drop for RaceController {
    fn drop(&mut self) {
        if let Some(race) = self.worker.get_mut().take() {
            if self.phase.get().is_active() {
                warn!(driver = %race.driver, "controller dropped mid-race, disqualifying");
                self.disqualify.store(true, Ordering::SeqCst);
            }
            Self::join(race);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use slotrace_sensor::SensorPort;
    use slotrace_time::ManualClock;

    use super::*;

    struct NoPorts;

    impl PortOpener for NoPorts {
        fn open(&self, port: &str, _config: &SensorConfig) -> SlotResult<Box<dyn SensorPort>> {
            Err(RaceError::LinkUnavailable(format!(
                "{port}: {}",
                io::Error::from(io::ErrorKind::NotFound)
            )))
        }
    }

    fn controller() -> (RaceController, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "slotrace-runtime-{}-{:?}",
            std::process::id(),
            thread::current().id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let config = ControllerConfig::in_dir(&dir);
        let stores = Stores::open(&dir);
        let controller = RaceController::with_parts(config, stores, Arc::new(NoPorts), Arc::new(ManualClock::new()));
        (controller, dir)
    }

    #[test]
    fn test_start_rejects_zero_laps_and_unknown_driver() {
        let (controller, dir) = controller();
        controller.add_driver("Jim").unwrap();

        assert!(matches!(controller.start_race("Jim", 0), Err(RaceError::InvalidInput(_))));
        assert!(matches!(controller.start_race("Nobody", 3), Err(RaceError::InvalidInput(_))));
        assert_eq!(controller.phase(), RacePhase::Idle);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_disqualify_while_idle_is_noop() {
        let (controller, dir) = controller();
        assert!(!controller.disqualify());
        assert!(controller.wait_idle().is_none());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_missing_sensor_aborts_and_returns_to_idle() {
        let (controller, dir) = controller();
        controller.add_driver("Jim").unwrap();

        controller.start_race("Jim", 3).unwrap();
        let outcome = controller.wait_idle();

        assert!(matches!(
            outcome,
            Some(RaceOutcome::Aborted {
                error: RaceError::LinkUnavailable(_)
            })
        ));
        assert_eq!(controller.phase(), RacePhase::Idle);
        assert!(controller.ranked_results().is_empty());
        let _ = std::fs::remove_dir_all(dir);
    }
}
