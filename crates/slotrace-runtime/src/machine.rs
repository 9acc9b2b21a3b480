//! Race state machine
//!
//! Drives one session through
//! `Countdown -> {EarlyStart | GreenFlag} -> Racing -> {Finished | Disqualified}`
//! and back to `Idle`, on the race worker thread.
//!
//! The machine polls the sensor once per scheduler tick, feeds pulses into
//! the lap timer, applies the early-start penalty to lap 1 and commits the
//! leaderboard after every lap. The operator reaches it only through the
//! disqualify flag, which is read-and-cleared between pulse checks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use slotrace_core::{LapRecord, RaceError, RaceEvent, RaceOutcome, RacePhase, RaceTime, SlotResult};
use slotrace_sensor::{PortOpener, SensorConfig, SensorLink};
use slotrace_store::LeaderboardStore;
use slotrace_time::{Clock, Countdown, CountdownConfig, CountdownStep, LapTimer};

use crate::{EventBus, PhaseCell, RaceSession};

/// Parameters for one session
#[derive(Clone, Debug)]
pub struct MachineConfig {
    /// Serial port the sensor is read from
    pub port: String,
    pub sensor: SensorConfig,
    pub countdown: CountdownConfig,
    /// Seconds added to lap 1 after an early start
    pub early_start_penalty: f64,
    /// Sensor poll cadence while racing
    pub poll_interval: Duration,
}

impl Default for MachineConfig {
    fn default() -> Self {
        let countdown = CountdownConfig::default();
        MachineConfig {
            port: slotrace_core::DEFAULT_SERIAL_PORT.to_string(),
            sensor: SensorConfig::default(),
            poll_interval: countdown.tick_interval,
            countdown,
            early_start_penalty: slotrace_core::DEFAULT_EARLY_START_PENALTY as f64,
        }
    }
}

/// Shared handles the machine reports through
#[derive(Clone)]
pub struct RaceContext {
    pub opener: Arc<dyn PortOpener>,
    pub clock: Arc<dyn Clock>,
    pub leaderboard: Arc<LeaderboardStore>,
    pub events: EventBus,
    pub disqualify: Arc<AtomicBool>,
    pub phase: PhaseCell,
}

/// How the countdown ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CountdownEnd {
    EarlyStart(RaceTime),
    GreenFlag(RaceTime),
    Disqualified,
}

/// Sets the shared phase back to idle on every exit path, including panics
struct IdleOnDrop(PhaseCell);

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        self.0.set(RacePhase::Idle);
    }
}

/// State machine for one race session
pub struct RaceStateMachine {
    session: RaceSession,
    link: Option<SensorLink>,
    ctx: RaceContext,
    config: MachineConfig,
}

impl RaceStateMachine {
    pub fn new(session: RaceSession, ctx: RaceContext, config: MachineConfig) -> Self {
        RaceStateMachine {
            session,
            link: None,
            ctx,
            config,
        }
    }

    /// Run the session to its end and return to idle
    ///
    /// The sensor link is acquired on entering the countdown and released
    /// before the phase goes back to idle, so the next session can acquire
    /// it as soon as a start is accepted.
    pub fn run(mut self) -> RaceOutcome {
        let idle = IdleOnDrop(self.ctx.phase.clone());
        let driver = self.session.driver().clone();

        let outcome = match self.drive() {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(driver = %driver, error = %err, "race aborted");
                self.ctx.events.publish(RaceEvent::Fault { error: err.clone() });
                RaceOutcome::Aborted { error: err }
            }
        };

        if let Some(mut link) = self.link.take() {
            link.close();
        }
        drop(idle);
        self.session.set_phase(RacePhase::Idle);
        self.ctx.events.publish(RaceEvent::PhaseChanged {
            phase: RacePhase::Idle,
        });
        self.ctx.events.publish(RaceEvent::SessionEnded {
            driver,
            outcome: outcome.clone(),
        });
        outcome
    }

    fn drive(&mut self) -> SlotResult<RaceOutcome> {
        self.enter(RacePhase::Countdown);
        self.link = Some(SensorLink::open(
            self.ctx.opener.as_ref(),
            &self.config.port,
            &self.config.sensor,
        )?);

        let (count_first_pulse, racing_since) = match self.run_countdown()? {
            CountdownEnd::Disqualified => return Ok(self.disqualify()),
            CountdownEnd::EarlyStart(at) => {
                self.session.mark_early_start();
                self.enter(RacePhase::EarlyStart);
                self.ctx.events.publish(RaceEvent::Go { early_start: true });
                (true, at)
            }
            CountdownEnd::GreenFlag(at) => {
                self.enter(RacePhase::GreenFlag);
                self.ctx.events.publish(RaceEvent::Go { early_start: false });
                (false, at)
            }
        };

        self.enter(RacePhase::Racing);
        let timer = LapTimer::new(self.session.laps_target(), count_first_pulse, racing_since)?;
        self.run_laps(timer)
    }

    fn run_countdown(&mut self) -> SlotResult<CountdownEnd> {
        let mut countdown = Countdown::new(&self.config.countdown);
        if let Some(seconds_remaining) = countdown.begin() {
            self.ctx.events.publish(RaceEvent::CountdownTick { seconds_remaining });
        }

        loop {
            if self.take_disqualify() {
                return Ok(CountdownEnd::Disqualified);
            }

            self.ctx.clock.sleep(countdown.tick_interval());
            let step = countdown.advance();

            // A pulse on the final tick still counts as an early start
            if self.poll_pulse()? {
                let at = self.ctx.clock.now();
                warn!(driver = %self.session.driver(), "early start detected");
                return Ok(CountdownEnd::EarlyStart(at));
            }

            match step {
                CountdownStep::Expired => return Ok(CountdownEnd::GreenFlag(self.ctx.clock.now())),
                CountdownStep::Announce(seconds_remaining) => {
                    self.ctx.events.publish(RaceEvent::CountdownTick { seconds_remaining });
                }
                CountdownStep::Running => {}
            }
        }
    }

    fn run_laps(&mut self, mut timer: LapTimer) -> SlotResult<RaceOutcome> {
        loop {
            if self.take_disqualify() {
                if let Some(start) = timer.current_lap_start() {
                    let partial = self.ctx.clock.now().secs_since(start);
                    info!(lap = timer.laps_completed() + 1, partial, "partial lap discarded");
                }
                return Ok(self.disqualify());
            }

            if self.poll_pulse()? {
                let at = self.ctx.clock.now();
                match timer.on_pulse(at) {
                    Some(lap) => {
                        self.complete_lap(lap);
                        if timer.is_complete() {
                            return Ok(self.finish());
                        }
                    }
                    None => debug!(at = ?at, "start line crossed, lap 1 timing"),
                }
            }

            self.ctx.clock.sleep(self.config.poll_interval);
        }
    }

    fn complete_lap(&mut self, lap: LapRecord) {
        let penalty = if self.session.early_start() && lap.lap_index == 0 {
            self.config.early_start_penalty
        } else {
            0.0
        };
        let lap = lap.with_penalty(penalty);
        let driver = self.session.driver().clone();

        info!(
            driver = %driver,
            lap = lap.lap_number(),
            duration = lap.duration,
            penalty,
            "lap completed"
        );
        self.session.record_lap(lap.clone());
        self.ctx.events.publish(RaceEvent::LapCompleted {
            driver: driver.clone(),
            lap: lap.clone(),
            penalty,
        });

        match self.ctx.leaderboard.upsert(&driver, lap.duration, lap.duration) {
            Ok(result) => self.ctx.events.publish(RaceEvent::ResultCommitted { result }),
            Err(err) => {
                warn!(driver = %driver, error = %err, "lap kept in memory, commit failed");
                self.ctx.events.publish(RaceEvent::Fault { error: err });
            }
        }
    }

    fn finish(&mut self) -> RaceOutcome {
        self.enter(RacePhase::Finished);
        RaceOutcome::Finished {
            laps: self.session.laps_completed(),
            best_lap: self.session.best_lap().unwrap_or_default(),
            last_lap: self.session.last_lap().unwrap_or_default(),
        }
    }

    fn disqualify(&mut self) -> RaceOutcome {
        self.session.mark_disqualified();
        self.enter(RacePhase::Disqualified);
        RaceOutcome::Disqualified {
            laps_completed: self.session.laps_completed(),
        }
    }

    fn poll_pulse(&mut self) -> SlotResult<bool> {
        match self.link.as_mut() {
            Some(link) => link.poll_pulse(),
            None => Err(RaceError::LinkUnavailable(format!("{}: link not open", self.config.port))),
        }
    }

    fn take_disqualify(&self) -> bool {
        self.ctx.disqualify.swap(false, Ordering::SeqCst)
    }

    fn enter(&mut self, phase: RacePhase) {
        info!(driver = %self.session.driver(), phase = phase.name(), "race phase");
        self.session.set_phase(phase);
        self.ctx.phase.set(phase);
        self.ctx.events.publish(RaceEvent::PhaseChanged { phase });
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use slotrace_core::Driver;
    use slotrace_sensor::SensorPort;
    use slotrace_time::ManualClock;

    use super::*;

    struct SilentPort;

    impl SensorPort for SilentPort {
        fn read_available(&mut self, _buf: &mut Vec<u8>) -> io::Result<usize> {
            Ok(0)
        }

        fn clear_input(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FixedOpener(bool);

    impl PortOpener for FixedOpener {
        fn open(&self, port: &str, _config: &SensorConfig) -> SlotResult<Box<dyn SensorPort>> {
            if self.0 {
                Ok(Box::new(SilentPort))
            } else {
                Err(RaceError::LinkUnavailable(format!("{port}: no such device")))
            }
        }
    }

    fn machine(opener_works: bool) -> (RaceStateMachine, RaceContext) {
        let ctx = RaceContext {
            opener: Arc::new(FixedOpener(opener_works)),
            clock: Arc::new(ManualClock::new()),
            // Nothing in these tests commits a lap, so the file is never written
            leaderboard: Arc::new(LeaderboardStore::open(
                std::env::temp_dir().join("slotrace-runtime-unused").join("results.json"),
            )),
            events: EventBus::new(64),
            disqualify: Arc::new(AtomicBool::new(false)),
            phase: PhaseCell::default(),
        };
        let session = RaceSession::new(Driver::new("Jim").unwrap(), 3).unwrap();
        let machine = RaceStateMachine::new(session, ctx.clone(), MachineConfig::default());
        (machine, ctx)
    }

    #[test]
    fn test_open_failure_aborts_session() {
        let (machine, ctx) = machine(false);
        let mut rx = ctx.events.subscribe();

        let outcome = machine.run();

        assert!(matches!(
            outcome,
            RaceOutcome::Aborted {
                error: RaceError::LinkUnavailable(_)
            }
        ));
        assert_eq!(ctx.phase.get(), RacePhase::Idle);

        let mut faults = 0;
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, RaceEvent::Fault { .. }) {
                faults += 1;
            }
            last = Some(event);
        }
        assert_eq!(faults, 1);
        assert!(matches!(last, Some(RaceEvent::SessionEnded { .. })));
    }

    #[test]
    fn test_disqualify_during_countdown() {
        let (machine, ctx) = machine(true);
        let mut rx = ctx.events.subscribe();
        ctx.disqualify.store(true, Ordering::SeqCst);

        let outcome = machine.run();

        assert_eq!(outcome, RaceOutcome::Disqualified { laps_completed: 0 });
        assert_eq!(ctx.phase.get(), RacePhase::Idle);
        assert!(!ctx.disqualify.load(Ordering::SeqCst));
        assert!(ctx.leaderboard.is_empty());

        let phases: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                RaceEvent::PhaseChanged { phase } => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![RacePhase::Countdown, RacePhase::Disqualified, RacePhase::Idle]
        );
    }

    #[test]
    fn test_silent_countdown_reaches_green_flag() {
        let (machine, ctx) = machine(true);
        let mut rx = ctx.events.subscribe();
        let clock = Arc::clone(&ctx.clock);
        let disqualify = Arc::clone(&ctx.disqualify);

        // Stop the race once it has been running for a minute of simulated time
        let worker = std::thread::spawn(move || machine.run());
        while clock.now() < RaceTime::from_secs_f64(60.0) {
            std::thread::yield_now();
        }
        disqualify.store(true, Ordering::SeqCst);
        let outcome = worker.join().unwrap();

        assert_eq!(outcome, RaceOutcome::Disqualified { laps_completed: 0 });
        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let ticks: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                RaceEvent::CountdownTick { seconds_remaining } => Some(*seconds_remaining),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![5, 4, 3, 2, 1]);
        assert!(events.contains(&RaceEvent::Go { early_start: false }));
        assert!(events.contains(&RaceEvent::PhaseChanged {
            phase: RacePhase::GreenFlag
        }));
    }
}
