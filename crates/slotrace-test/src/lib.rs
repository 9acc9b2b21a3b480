//! SlotRace Test Harness - Deterministic race simulation
//!
//! This crate provides:
//! - A scripted sensor port replaying crossings on a simulated clock
//! - A race simulator wiring the controller to that port
//! - Race scenarios (green flag, early start, disqualification, unplug)

pub mod scenarios;
pub mod scripted;
pub mod simulator;

pub use scenarios::*;
pub use scripted::*;
pub use simulator::*;
