//! SlotRace Sensor - Serial link to the start/finish line sensor
//!
//! This crate provides:
//! - Sensor port abstraction (real serial port or any byte source)
//! - Line decoding of the sensor's `"1"` pulse protocol
//! - SensorLink: session-scoped, edge-triggered pulse polling

pub mod config;
pub mod decoder;
pub mod port;
pub mod link;

pub use config::*;
pub use decoder::*;
pub use port::*;
pub use link::*;
