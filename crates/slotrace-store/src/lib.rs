//! SlotRace Store - Durable race state
//!
//! This crate implements the three persisted stores:
//! - Roster (ordered driver names)
//! - Leaderboard (per-driver last/best lap, ranked reads)
//! - Settings (serial port, early-start penalty)
//!
//! Each store is shared behind an `Arc`, serializes mutations with a mutex
//! and commits to disk before a mutating call returns. Missing or corrupt
//! files load as empty.

pub mod file;
pub mod leaderboard;
pub mod roster;
pub mod settings;

pub use file::*;
pub use leaderboard::*;
pub use roster::*;
pub use settings::*;

use std::path::Path;
use std::sync::Arc;

/// Roster file name inside the data directory
pub const DRIVERS_FILE: &str = "drivers.json";
/// Leaderboard file name inside the data directory
pub const RESULTS_FILE: &str = "results.json";
/// Settings file name inside the data directory
pub const SETTINGS_FILE: &str = "settings.json";

/// The three stores of one data directory
#[derive(Clone)]
pub struct Stores {
    pub roster: Arc<RosterStore>,
    pub leaderboard: Arc<LeaderboardStore>,
    pub settings: Arc<SettingsStore>,
}

impl Stores {
    /// Load all stores from `data_dir`
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        let leaderboard = Arc::new(LeaderboardStore::open(dir.join(RESULTS_FILE)));
        let roster = Arc::new(RosterStore::open(dir.join(DRIVERS_FILE), Arc::clone(&leaderboard)));
        let settings = Arc::new(SettingsStore::open(dir.join(SETTINGS_FILE)));

        Stores {
            roster,
            leaderboard,
            settings,
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::path::PathBuf;

    use rand::Rng;

    /// Fresh, not yet existing directory under the OS temp dir
    pub fn temp_dir() -> PathBuf {
        let suffix: u64 = rand::thread_rng().gen();
        std::env::temp_dir().join(format!("slotrace-store-{suffix:016x}"))
    }
}
