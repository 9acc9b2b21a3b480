//! Error types for race timing

use thiserror::Error;

/// Core race errors
///
/// Validation errors (`InvalidInput`, `DuplicateDriver`, `SessionBusy`) are
/// returned synchronously at the call boundary before any state changes.
/// `LinkUnavailable` and `StorageError` are runtime faults; during an active
/// race they are also published as fault events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RaceError {
    // Sensor errors
    #[error("Sensor link unavailable: {0}")]
    LinkUnavailable(String),

    // Validation errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Driver already exists: {0}")]
    DuplicateDriver(String),

    #[error("A race session is already active")]
    SessionBusy,

    // Persistence errors
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl RaceError {
    /// Whether this error was raised by input validation rather than a fault
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RaceError::InvalidInput(_) | RaceError::DuplicateDriver(_) | RaceError::SessionBusy
        )
    }
}

/// Result type for race operations
pub type SlotResult<T> = Result<T, RaceError>;
