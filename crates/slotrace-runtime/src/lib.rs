//! SlotRace Runtime - Race sessions and the operator controller
//!
//! This crate implements the race lifecycle:
//! 1. Validate the start request and claim the session slot
//! 2. Acquire the sensor link
//! 3. Count down, watching for an early start
//! 4. Time laps and commit each one to the leaderboard
//! 5. Finish, disqualify or abort
//! 6. Release the sensor and return to idle
//!
//! Steps 2-6 run on a dedicated race worker thread; observers follow
//! along through the event bus.

pub mod controller;
pub mod events;
pub mod machine;
pub mod session;

pub use controller::*;
pub use events::*;
pub use machine::*;
pub use session::*;
