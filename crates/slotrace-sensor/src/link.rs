//! Session-scoped sensor link
//!
//! A `SensorLink` is the exclusive handle on the lap sensor for one race
//! session. Pulses are edge-triggered: every `"1"` line is reported by
//! exactly one `poll_pulse` call. When several crossings arrive between two
//! polls they are reported by consecutive polls, so none is lost.

use tracing::{debug, info};

use slotrace_core::{RaceError, SlotResult};

use crate::{LineDecoder, PortOpener, SensorConfig, SensorPort};

/// Exclusive connection to the lap sensor
pub struct SensorLink {
    name: String,
    port: Option<Box<dyn SensorPort>>,
    decoder: LineDecoder,
    scratch: Vec<u8>,
}

impl SensorLink {
    /// Acquire the sensor on `port`
    ///
    /// Bytes buffered before the link was opened are flushed so stale
    /// crossings never count.
    pub fn open(opener: &dyn PortOpener, port: &str, config: &SensorConfig) -> SlotResult<Self> {
        let handle = opener.open(port, config)?;
        let mut link = Self::from_port(port, handle);
        link.flush()?;
        info!(port, baud = config.baud_rate, "sensor link opened");
        Ok(link)
    }

    /// Wrap an already opened port
    pub fn from_port(name: impl Into<String>, port: Box<dyn SensorPort>) -> Self {
        SensorLink {
            name: name.into(),
            port: Some(port),
            decoder: LineDecoder::new(),
            scratch: Vec::with_capacity(64),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port_mut(&mut self) -> SlotResult<&mut Box<dyn SensorPort>> {
        let name = &self.name;
        self.port
            .as_mut()
            .ok_or_else(|| RaceError::LinkUnavailable(format!("{name}: link closed")))
    }

    /// Non-blocking pulse check
    ///
    /// Consumes whatever bytes are buffered and reports one pending pulse.
    /// Read failures mean the sensor is gone and surface as
    /// `LinkUnavailable`.
    pub fn poll_pulse(&mut self) -> SlotResult<bool> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();

        let read = self
            .port_mut()?
            .read_available(&mut scratch)
            .map_err(|e| RaceError::LinkUnavailable(format!("{}: {e}", self.name)));

        let result = read.map(|n| {
            if n > 0 {
                let decoded = self.decoder.push(&scratch);
                if decoded > 1 {
                    debug!(port = %self.name, pulses = decoded, "multiple pulses buffered");
                }
            }
            self.decoder.take_pulse()
        });

        self.scratch = scratch;
        result
    }

    /// Discard buffered bytes and pending pulses
    pub fn flush(&mut self) -> SlotResult<()> {
        let name = self.name.clone();
        self.port_mut()?
            .clear_input()
            .map_err(|e| RaceError::LinkUnavailable(format!("{name}: {e}")))?;
        self.decoder.clear();
        Ok(())
    }

    /// Release the sensor; idempotent
    pub fn close(&mut self) {
        if self.port.take().is_some() {
            self.decoder.clear();
            info!(port = %self.name, "sensor link closed");
        }
    }
}

impl Drop for SensorLink {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SensorLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorLink")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .field("queued", &self.decoder.queued_pulses())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Port fed from a shared queue of chunks, one chunk per read
    #[derive(Clone, Default)]
    struct QueuePort {
        chunks: Arc<Mutex<VecDeque<Vec<u8>>>>,
        broken: Arc<Mutex<bool>>,
    }

    impl QueuePort {
        fn feed(&self, bytes: &[u8]) {
            self.chunks.lock().unwrap().push_back(bytes.to_vec());
        }

        fn unplug(&self) {
            *self.broken.lock().unwrap() = true;
        }
    }

    impl SensorPort for QueuePort {
        fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
            if *self.broken.lock().unwrap() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device removed"));
            }
            match self.chunks.lock().unwrap().pop_front() {
                Some(chunk) => {
                    buf.extend_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }

        fn clear_input(&mut self) -> io::Result<()> {
            self.chunks.lock().unwrap().clear();
            Ok(())
        }
    }

    struct QueueOpener(QueuePort);

    impl PortOpener for QueueOpener {
        fn open(&self, _port: &str, _config: &SensorConfig) -> SlotResult<Box<dyn SensorPort>> {
            Ok(Box::new(self.0.clone()))
        }
    }

    #[test]
    fn test_pulse_is_edge_triggered() {
        let port = QueuePort::default();
        let mut link = SensorLink::from_port("test", Box::new(port.clone()));

        port.feed(b"1\n");
        assert!(link.poll_pulse().unwrap());
        assert!(!link.poll_pulse().unwrap());
    }

    #[test]
    fn test_buffered_pulses_reported_one_per_poll() {
        let port = QueuePort::default();
        let mut link = SensorLink::from_port("test", Box::new(port.clone()));

        port.feed(b"1\n1\n");
        assert!(link.poll_pulse().unwrap());
        assert!(link.poll_pulse().unwrap());
        assert!(!link.poll_pulse().unwrap());
    }

    #[test]
    fn test_partial_line_completes_on_later_poll() {
        let port = QueuePort::default();
        let mut link = SensorLink::from_port("test", Box::new(port.clone()));

        port.feed(b"1");
        assert!(!link.poll_pulse().unwrap());
        port.feed(b"\r\n");
        assert!(link.poll_pulse().unwrap());
    }

    #[test]
    fn test_open_flushes_stale_bytes() {
        let port = QueuePort::default();
        port.feed(b"1\n");

        let opener = QueueOpener(port.clone());
        let mut link = SensorLink::open(&opener, "COM3", &SensorConfig::default()).unwrap();
        assert!(!link.poll_pulse().unwrap());
    }

    #[test]
    fn test_read_failure_is_link_unavailable() {
        let port = QueuePort::default();
        let mut link = SensorLink::from_port("test", Box::new(port.clone()));

        port.unplug();
        assert!(matches!(link.poll_pulse(), Err(RaceError::LinkUnavailable(_))));
    }

    #[test]
    fn test_close_is_idempotent() {
        let port = QueuePort::default();
        let mut link = SensorLink::from_port("test", Box::new(port));

        link.close();
        link.close();
        assert!(!link.is_open());
        assert!(matches!(link.poll_pulse(), Err(RaceError::LinkUnavailable(_))));
    }
}
