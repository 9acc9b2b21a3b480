//! Scripted sensor port
//!
//! Replays a timeline of sensor bytes against a simulated clock: a chunk
//! scheduled at `t` becomes readable once the clock reaches `t`. The port
//! can also be told to fail reads from a given instant, or to refuse to
//! open at all.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use slotrace_core::{RaceError, RaceTime, SlotResult};
use slotrace_sensor::{PortOpener, SensorConfig, SensorPort};
use slotrace_time::Clock;

#[derive(Debug, Default)]
struct Script {
    /// Pending chunks, ordered by delivery time
    chunks: Vec<(RaceTime, Vec<u8>)>,
    fail_at: Option<RaceTime>,
    refuse_open: bool,
    opens: u32,
    releases: u32,
    bytes_delivered: usize,
}

impl Script {
    fn schedule(&mut self, at: RaceTime, bytes: Vec<u8>) {
        let idx = self.chunks.partition_point(|(t, _)| *t <= at);
        self.chunks.insert(idx, (at, bytes));
    }

    fn due(&self, now: RaceTime) -> usize {
        self.chunks.partition_point(|(t, _)| *t <= now)
    }
}

/// Shared timeline of sensor traffic
///
/// Clones share the same script, so a test keeps one handle while the race
/// worker reads through another.
#[derive(Clone)]
pub struct ScriptedPort {
    script: Arc<Mutex<Script>>,
    clock: Arc<dyn Clock>,
}

impl ScriptedPort {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        ScriptedPort {
            script: Arc::new(Mutex::new(Script::default())),
            clock,
        }
    }

    /// Deliver raw bytes once the clock reaches `at`
    pub fn send_at(&self, at: RaceTime, bytes: &[u8]) {
        self.script.lock().schedule(at, bytes.to_vec());
    }

    /// Deliver one sensor crossing (`"1\r\n"`) at `secs`
    pub fn pulse_at(&self, secs: f64) {
        self.send_at(RaceTime::from_secs_f64(secs), b"1\r\n");
    }

    /// Deliver one crossing at each of `secs`
    pub fn pulses_at(&self, secs: &[f64]) {
        for &s in secs {
            self.pulse_at(s);
        }
    }

    /// Make every read fail from `secs` on, as if the device was unplugged
    pub fn fail_at(&self, secs: f64) {
        self.script.lock().fail_at = Some(RaceTime::from_secs_f64(secs));
    }

    /// Make the opener refuse this port
    pub fn refuse_open(&self) {
        self.script.lock().refuse_open = true;
    }

    /// Times the port has been acquired
    pub fn opens(&self) -> u32 {
        self.script.lock().opens
    }

    /// Times an acquired port has been released
    pub fn releases(&self) -> u32 {
        self.script.lock().releases
    }

    /// Whether a link currently holds the port
    pub fn is_held(&self) -> bool {
        let script = self.script.lock();
        script.opens > script.releases
    }

    /// Chunks scheduled but not yet read
    pub fn pending(&self) -> usize {
        self.script.lock().chunks.len()
    }

    pub fn bytes_delivered(&self) -> usize {
        self.script.lock().bytes_delivered
    }

    /// Opener handing out handles on this script
    pub fn opener(&self) -> ScriptedOpener {
        ScriptedOpener { port: self.clone() }
    }
}

/// Handle held by one sensor link; counts as released when dropped
struct ScriptedHandle {
    port: ScriptedPort,
}

impl SensorPort for ScriptedHandle {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let now = self.port.clock.now();
        let mut script = self.port.script.lock();

        if script.fail_at.is_some_and(|t| t <= now) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sensor unplugged"));
        }

        let due = script.due(now);
        let mut read = 0;
        for (_, chunk) in script.chunks.drain(..due) {
            buf.extend_from_slice(&chunk);
            read += chunk.len();
        }
        script.bytes_delivered += read;
        Ok(read)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        let now = self.port.clock.now();
        let mut script = self.port.script.lock();
        let due = script.due(now);
        if due > 0 {
            debug!(chunks = due, "scripted input discarded");
        }
        script.chunks.drain(..due);
        Ok(())
    }
}

impl Drop for ScriptedHandle {
    fn drop(&mut self) {
        self.port.script.lock().releases += 1;
    }
}

/// `PortOpener` over a `ScriptedPort`
#[derive(Clone)]
pub struct ScriptedOpener {
    port: ScriptedPort,
}

impl PortOpener for ScriptedOpener {
    fn open(&self, port: &str, _config: &SensorConfig) -> SlotResult<Box<dyn SensorPort>> {
        let mut script = self.port.script.lock();
        if script.refuse_open {
            return Err(RaceError::LinkUnavailable(format!("{port}: access denied")));
        }
        script.opens += 1;
        drop(script);

        Ok(Box::new(ScriptedHandle {
            port: self.port.clone(),
        }))
    }
}
