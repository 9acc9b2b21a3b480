//! Sensor port implementations
//!
//! `SensorPort` is the byte source a `SensorLink` reads from. The serial
//! implementation wraps the `serialport` crate; simulations provide their
//! own ports through `PortOpener`.

use std::io::{self, Read};

use serialport::{ClearBuffer, SerialPort};
use slotrace_core::{RaceError, SlotResult};

use crate::SensorConfig;

/// Byte source for the sensor link
pub trait SensorPort: Send {
    /// Append whatever bytes are currently buffered to `buf`
    ///
    /// Must not wait for bytes that have not arrived yet beyond the
    /// configured read timeout. Returns the number of bytes appended.
    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;

    /// Discard buffered input
    fn clear_input(&mut self) -> io::Result<()>;
}

/// Acquires sensor ports by name
pub trait PortOpener: Send + Sync {
    fn open(&self, port: &str, config: &SensorConfig) -> SlotResult<Box<dyn SensorPort>>;
}

/// Sensor port over a real serial device
pub struct SerialSensorPort {
    inner: Box<dyn SerialPort>,
}

impl SerialSensorPort {
    /// Open `path` with the configured baud rate and read timeout
    pub fn open(path: &str, config: &SensorConfig) -> SlotResult<Self> {
        let inner = serialport::new(path, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| RaceError::LinkUnavailable(format!("{path}: {e}")))?;

        Ok(SerialSensorPort { inner })
    }
}

impl SensorPort for SerialSensorPort {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let waiting = self.inner.bytes_to_read()? as usize;
        if waiting == 0 {
            return Ok(0);
        }

        let start = buf.len();
        buf.resize(start + waiting, 0);
        match self.inner.read(&mut buf[start..]) {
            Ok(n) => {
                buf.truncate(start + n);
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                buf.truncate(start);
                Ok(0)
            }
            Err(e) => {
                buf.truncate(start);
                Err(e)
            }
        }
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.inner.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

/// Opens real serial ports
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialOpener;

impl PortOpener for SerialOpener {
    fn open(&self, port: &str, config: &SensorConfig) -> SlotResult<Box<dyn SensorPort>> {
        Ok(Box::new(SerialSensorPort::open(port, config)?))
    }
}

/// Names of serial ports present on this machine
pub fn available_ports() -> SlotResult<Vec<String>> {
    let ports = serialport::available_ports()
        .map_err(|e| RaceError::LinkUnavailable(format!("cannot enumerate ports: {e}")))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
