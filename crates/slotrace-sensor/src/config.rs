//! Sensor link configuration

use std::time::Duration;

/// Baud rate spoken by the lap sensor firmware
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Upper bound on a single read from the port
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial settings for the sensor link
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SensorConfig {
    pub baud_rate: u32,
    /// Bounds every poll; a poll never blocks longer than this
    pub read_timeout: Duration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}
