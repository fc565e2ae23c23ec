//! JSON dataset used to seed and snapshot the in-memory store

use crate::domain::records::{
    AppointmentRecord, ConsentRecord, OffstudyRecord, RegisteredSubject, VisitRecord,
};
use crate::domain::{OffstudyError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete contents of a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub subjects: Vec<RegisteredSubject>,
    #[serde(default)]
    pub consents: Vec<ConsentRecord>,
    #[serde(default)]
    pub visits: Vec<VisitRecord>,
    #[serde(default)]
    pub appointments: Vec<AppointmentRecord>,
    #[serde(default)]
    pub offstudy: Vec<OffstudyRecord>,
}

impl Dataset {
    /// Read a dataset from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid dataset.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            OffstudyError::Io(format!("Failed to read dataset {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Parse a dataset from a JSON string
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| OffstudyError::Serialization(format!("Invalid dataset: {e}")))
    }
}
