//! SlotRace console front end
//!
//! Line-oriented operator console over a `RaceController`: roster and
//! settings management, race start and disqualification, leaderboard
//! display and JSON export. Race events are printed as they happen.

pub mod cli;
pub mod commands;
pub mod console;
pub mod render;
