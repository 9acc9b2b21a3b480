//! SlotRace Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout the race timing system:
//! - Driver identity (the display name itself)
//! - Time primitives (RaceTime on the monotonic race clock)
//! - Results, lap records and operator settings
//! - Race phases, outcomes and observer events
//! - The error taxonomy shared by every layer

pub mod driver;
pub mod time;
pub mod models;
pub mod event;
pub mod error;

pub use driver::*;
pub use time::*;
pub use models::*;
pub use event::*;
pub use error::*;
