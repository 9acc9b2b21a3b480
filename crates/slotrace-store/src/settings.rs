//! Operator settings store

use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::info;

use slotrace_core::{RaceError, Settings, SlotResult};

use crate::JsonFile;

/// Persisted operator settings; every change is written immediately
pub struct SettingsStore {
    settings: Mutex<Settings>,
    file: JsonFile<Settings>,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let file: JsonFile<Settings> = JsonFile::new(path);
        SettingsStore {
            settings: Mutex::new(file.load()),
            file,
        }
    }

    /// Snapshot of the current settings
    pub fn settings(&self) -> Settings {
        self.settings.lock().clone()
    }

    pub fn set_serial_port(&self, port: &str) -> SlotResult<()> {
        let port = port.trim();
        if port.is_empty() {
            return Err(RaceError::InvalidInput("serial port cannot be empty".into()));
        }

        self.update(|s| s.serial_port = port.to_string())?;
        info!(port, "serial port set");
        Ok(())
    }

    pub fn set_early_start_penalty(&self, seconds: u32) -> SlotResult<()> {
        self.update(|s| s.early_start_penalty = seconds)?;
        info!(seconds, "early start penalty set");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Settings)) -> SlotResult<()> {
        let mut settings = self.settings.lock();
        apply(&mut settings);
        self.file.save(&settings)
    }
}
