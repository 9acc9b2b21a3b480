//! SlotRace Time - Clocks, countdown and lap timing
//!
//! This crate implements the pure timing core:
//! - Clock abstraction (monotonic wall clock, manual clock for simulation)
//! - Countdown sequencing at tick resolution with per-second announcements
//! - Lap timer turning sensor pulses into lap boundaries and durations
//!
//! Nothing here touches the sensor or storage; the race runtime drives
//! these types tick by tick.

pub mod clock;
pub mod countdown;
pub mod lap_timer;

pub use clock::*;
pub use countdown::*;
pub use lap_timer::*;
