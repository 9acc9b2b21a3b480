//! Leaderboard store
//!
//! One `RaceResult` per driver, kept in insertion order. Ranked reads sort
//! by best time with a stable sort, so equal best times keep the order in
//! which drivers first posted a lap.

use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use slotrace_core::{Driver, ExportRow, RaceError, RaceResult, SlotResult};

use crate::JsonFile;

/// Persisted per-driver results
pub struct LeaderboardStore {
    results: Mutex<Vec<RaceResult>>,
    file: JsonFile<Vec<RaceResult>>,
}

impl LeaderboardStore {
    /// Load the leaderboard from `path`
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let file: JsonFile<Vec<RaceResult>> = JsonFile::new(path);
        let mut results: Vec<RaceResult> = Vec::new();
        for result in file.load() {
            if results.iter().any(|r| r.driver == result.driver) {
                warn!(driver = %result.driver, "duplicate leaderboard entry ignored");
                continue;
            }
            results.push(result);
        }

        LeaderboardStore {
            results: Mutex::new(results),
            file,
        }
    }

    /// Record a lap for `driver`
    ///
    /// A new driver gets `last = best = best_candidate`. An existing driver
    /// gets `last = last_time` and keeps the smaller best time. The result
    /// is on disk when this returns `Ok`; on a failed write the in-memory
    /// board keeps the update and the next successful commit persists it.
    pub fn upsert(&self, driver: &Driver, last_time: f64, best_candidate: f64) -> SlotResult<RaceResult> {
        for t in [last_time, best_candidate] {
            if !t.is_finite() || t < 0.0 {
                return Err(RaceError::InvalidInput(format!("invalid lap time {t}")));
            }
        }

        let mut results = self.results.lock();
        let result = match results.iter_mut().find(|r| &r.driver == driver) {
            Some(existing) => {
                existing.record(last_time, best_candidate);
                existing.clone()
            }
            None => {
                let created = RaceResult::new(driver.clone(), best_candidate);
                results.push(created.clone());
                created
            }
        };

        self.file.save(&results)?;
        debug!(
            driver = %driver,
            last = result.last_time,
            best = result.best_time,
            "leaderboard updated"
        );
        Ok(result)
    }

    /// All results, fastest best time first
    pub fn ranked_results(&self) -> Vec<RaceResult> {
        let mut ranked = self.results.lock().clone();
        ranked.sort_by(|a, b| a.best_time.total_cmp(&b.best_time));
        ranked
    }

    /// Ranked snapshot for spreadsheet export
    pub fn export_rows(&self) -> Vec<ExportRow> {
        ExportRow::from_ranked(&self.ranked_results())
    }

    pub fn get(&self, driver: &str) -> Option<RaceResult> {
        self.results
            .lock()
            .iter()
            .find(|r| r.driver == driver)
            .cloned()
    }

    /// Delete `driver`'s result; absent drivers are a no-op
    pub fn remove_driver(&self, driver: &str) -> SlotResult<bool> {
        let mut results = self.results.lock();
        let before = results.len();
        results.retain(|r| r.driver != driver);
        if results.len() == before {
            return Ok(false);
        }

        self.file.save(&results)?;
        info!(driver, "leaderboard entry removed");
        Ok(true)
    }

    /// Write the current board to disk, e.g. after an earlier failed commit
    pub fn persist(&self) -> SlotResult<()> {
        let results = self.results.lock();
        self.file.save(&results)
    }

    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }
}
