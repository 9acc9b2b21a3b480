//! Race data model
//!
//! - `RaceResult`: persisted per-driver best/last lap times
//! - `LapRecord`: one timed lap, alive only for the duration of a race
//! - `Settings`: operator settings persisted on every change
//! - `ExportRow`: ranked snapshot row handed to spreadsheet renderers

use serde::{Deserialize, Serialize};

use crate::{format_seconds, Driver, RaceTime};

/// Default serial port for the lap sensor
pub const DEFAULT_SERIAL_PORT: &str = "COM3";

/// Default early-start penalty in whole seconds
pub const DEFAULT_EARLY_START_PENALTY: u32 = 2;

/// Per-driver leaderboard entry
///
/// `best_time` is the historical minimum lap across all races, `last_time`
/// is the most recently committed lap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub driver: Driver,
    /// Seconds
    pub last_time: f64,
    /// Seconds
    pub best_time: f64,
}

impl RaceResult {
    pub fn new(driver: Driver, time: f64) -> Self {
        RaceResult {
            driver,
            last_time: time,
            best_time: time,
        }
    }

    /// Overwrite the last time and keep the minimum best time
    pub fn record(&mut self, last_time: f64, best_candidate: f64) {
        self.last_time = last_time;
        self.best_time = self.best_time.min(best_candidate);
    }

    pub fn display_last(&self) -> String {
        format_seconds(self.last_time)
    }

    pub fn display_best(&self) -> String {
        format_seconds(self.best_time)
    }
}

/// A single completed lap
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    /// Zero-based lap index within the session
    pub lap_index: u32,
    pub start_time: RaceTime,
    pub end_time: RaceTime,
    /// Lap duration in seconds (including any penalty once recorded)
    pub duration: f64,
}

impl LapRecord {
    pub fn new(lap_index: u32, start_time: RaceTime, end_time: RaceTime) -> Self {
        LapRecord {
            lap_index,
            start_time,
            end_time,
            duration: end_time.secs_since(start_time),
        }
    }

    /// Lap number as shown to operators (1-based)
    pub fn lap_number(&self) -> u32 {
        self.lap_index + 1
    }

    /// Return this lap with `penalty` seconds added to its duration
    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.duration += penalty;
        self
    }
}

/// Operator settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub serial_port: String,
    /// Seconds added to lap 1 after an early start
    pub early_start_penalty: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            serial_port: DEFAULT_SERIAL_PORT.to_string(),
            early_start_penalty: DEFAULT_EARLY_START_PENALTY,
        }
    }
}

/// Ranked leaderboard row for export
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    /// 1-based rank
    pub rank: usize,
    pub driver: Driver,
    pub last_time: f64,
    pub best_time: f64,
}

impl ExportRow {
    /// Build export rows from an already ranked sequence
    pub fn from_ranked<'a>(ranked: impl IntoIterator<Item = &'a RaceResult>) -> Vec<ExportRow> {
        ranked
            .into_iter()
            .enumerate()
            .map(|(i, r)| ExportRow {
                rank: i + 1,
                driver: r.driver.clone(),
                last_time: r.last_time,
                best_time: r.best_time,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(name: &str) -> Driver {
        Driver::new(name).unwrap()
    }

    #[test]
    fn test_record_keeps_minimum_best() {
        let mut result = RaceResult::new(driver("A"), 10.2);
        result.record(11.0, 10.5);
        assert_eq!(result.last_time, 11.0);
        assert_eq!(result.best_time, 10.2);

        result.record(9.8, 9.8);
        assert_eq!(result.best_time, 9.8);
    }

    #[test]
    fn test_lap_record_duration_and_penalty() {
        let lap = LapRecord::new(0, RaceTime::from_secs_f64(2.0), RaceTime::from_secs_f64(7.0));
        assert!((lap.duration - 5.0).abs() < 1e-9);
        assert_eq!(lap.lap_number(), 1);

        let penalised = lap.with_penalty(2.0);
        assert!((penalised.duration - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_settings_defaults_fill_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{"serial_port":"/dev/ttyUSB0"}"#).unwrap();
        assert_eq!(settings.serial_port, "/dev/ttyUSB0");
        assert_eq!(settings.early_start_penalty, DEFAULT_EARLY_START_PENALTY);
    }

    #[test]
    fn test_export_rows_are_one_based() {
        let results = vec![RaceResult::new(driver("A"), 9.0), RaceResult::new(driver("B"), 9.5)];
        let rows = ExportRow::from_ranked(&results);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].rank, 2);
        assert_eq!(rows[1].driver, "B");
    }
}
