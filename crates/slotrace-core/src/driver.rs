//! Driver identity
//!
//! A driver is identified by its display name. Names are compared exactly
//! (case-sensitive) and are never renamed, only added and removed.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{RaceError, SlotResult};

/// Driver display name
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Driver(String);

impl Driver {
    /// Create a driver, rejecting empty or whitespace-only names
    pub fn new(name: impl Into<String>) -> SlotResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RaceError::InvalidInput("driver name cannot be empty".into()));
        }
        Ok(Driver(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Borrow<str> for Driver {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Driver {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Driver {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Driver {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Driver({:?})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_rejects_blank() {
        assert!(matches!(Driver::new(""), Err(RaceError::InvalidInput(_))));
        assert!(matches!(Driver::new("   "), Err(RaceError::InvalidInput(_))));
    }

    #[test]
    fn test_driver_is_case_sensitive() {
        let a = Driver::new("Ayrton").unwrap();
        let b = Driver::new("ayrton").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, "Ayrton");
    }

    #[test]
    fn test_driver_serializes_as_plain_string() {
        let driver = Driver::new("Nigel").unwrap();
        let json = serde_json::to_string(&driver).unwrap();
        assert_eq!(json, "\"Nigel\"");
    }
}
