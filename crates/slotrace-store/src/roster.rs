//! Driver roster

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use slotrace_core::{Driver, RaceError, SlotResult};

use crate::{JsonFile, LeaderboardStore};

/// Persisted, ordered set of driver names
pub struct RosterStore {
    drivers: Mutex<Vec<Driver>>,
    file: JsonFile<Vec<Driver>>,
    leaderboard: Arc<LeaderboardStore>,
}

impl RosterStore {
    /// Load the roster from `path`; removals cascade into `leaderboard`
    pub fn open(path: impl Into<PathBuf>, leaderboard: Arc<LeaderboardStore>) -> Self {
        let file: JsonFile<Vec<Driver>> = JsonFile::new(path);
        let mut drivers: Vec<Driver> = Vec::new();
        for driver in file.load() {
            if driver.as_str().trim().is_empty() || drivers.contains(&driver) {
                warn!(driver = %driver, "invalid roster entry ignored");
                continue;
            }
            drivers.push(driver);
        }

        RosterStore {
            drivers: Mutex::new(drivers),
            file,
            leaderboard,
        }
    }

    /// Add a driver; names are unique (exact, case-sensitive match)
    pub fn add(&self, name: &str) -> SlotResult<Driver> {
        let driver = Driver::new(name)?;

        let mut drivers = self.drivers.lock();
        if drivers.contains(&driver) {
            return Err(RaceError::DuplicateDriver(name.to_string()));
        }
        drivers.push(driver.clone());
        self.file.save(&drivers)?;

        info!(driver = %driver, "driver added");
        Ok(driver)
    }

    /// Remove a driver and their leaderboard entry
    ///
    /// Absent names are a no-op. Returns whether the roster changed.
    pub fn remove(&self, name: &str) -> SlotResult<bool> {
        let removed = {
            let mut drivers = self.drivers.lock();
            let before = drivers.len();
            drivers.retain(|d| d != name);
            let removed = drivers.len() != before;
            if removed {
                self.file.save(&drivers)?;
            }
            removed
        };

        self.leaderboard.remove_driver(name)?;
        if removed {
            info!(driver = name, "driver removed");
        }
        Ok(removed)
    }

    /// Drivers in insertion order
    pub fn list(&self) -> Vec<Driver> {
        self.drivers.lock().clone()
    }

    pub fn get(&self, name: &str) -> Option<Driver> {
        self.drivers.lock().iter().find(|d| *d == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.drivers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.lock().is_empty()
    }
}
