//! JSON file persistence
//!
//! Saves go through a temporary sibling file that is fsynced and renamed
//! over the target, so a crash leaves either the old or the new contents.

use std::fs::{self, File};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use slotrace_core::{RaceError, SlotResult};

/// Typed JSON document on disk
#[derive(Debug)]
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFile {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document; absence or corruption yields the default value
    pub fn load(&self) -> T {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored data, starting empty");
                return T::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable store, starting empty");
                return T::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt store, starting empty");
                T::default()
            }
        }
    }

    /// Durably replace the document
    pub fn save(&self, value: &T) -> SlotResult<()> {
        self.write_atomic(value).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "store commit failed");
            RaceError::StorageError(format!("{}: {e}", self.path.display()))
        })
    }

    fn write_atomic(&self, value: &T) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
        let tmp = self.tmp_path();
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::temp_dir;

    #[test]
    fn test_missing_file_loads_default() {
        let file: JsonFile<Vec<String>> = JsonFile::new(temp_dir().join("absent.json"));
        assert!(file.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_default() {
        let dir = temp_dir();
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("drivers.json");
        fs::write(&path, b"[\"Jim\", ").unwrap();

        let file: JsonFile<Vec<String>> = JsonFile::new(&path);
        assert!(file.load().is_empty());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_save_creates_directory_and_replaces() {
        let dir = temp_dir();
        let file: JsonFile<Vec<String>> = JsonFile::new(dir.join("nested").join("drivers.json"));

        file.save(&vec!["Jim".to_string()]).unwrap();
        file.save(&vec!["Jim".to_string(), "Jackie".to_string()]).unwrap();

        assert_eq!(file.load(), vec!["Jim".to_string(), "Jackie".to_string()]);
        assert!(!file.tmp_path().exists());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_save_failure_is_storage_error() {
        let dir = temp_dir();
        fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let file: JsonFile<Vec<String>> = JsonFile::new(blocker.join("drivers.json"));
        assert!(matches!(file.save(&Vec::new()), Err(RaceError::StorageError(_))));
        let _ = fs::remove_dir_all(dir);
    }
}
