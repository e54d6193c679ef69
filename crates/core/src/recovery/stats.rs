//! Error statistics and the JSON records written by the recovery pass.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::journal::{read_json, write_json, JournalError};

/// Cumulative error counts, persisted across runs in `stats.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorStats {
    #[serde(default)]
    pub total_errors: u64,
    #[serde(default)]
    pub errors_by_torrent: BTreeMap<String, u64>,
    #[serde(default)]
    pub errors_by_message: BTreeMap<String, u64>,
}

impl ErrorStats {
    /// Load stats, starting from zero when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Self, JournalError> {
        Ok(read_json(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<(), JournalError> {
        write_json(path, self)
    }

    /// Count one observed error.
    pub fn record(&mut self, torrent: &str, message: &str) {
        self.total_errors += 1;
        *self
            .errors_by_torrent
            .entry(torrent.to_string())
            .or_default() += 1;
        *self
            .errors_by_message
            .entry(message.to_string())
            .or_default() += 1;
    }
}

/// A torrent observed in the `Error` state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub name: String,
    pub save_path: String,
    pub message: String,
    pub tracker_status: String,
    pub timestamp: String,
}

/// A finished torrent removed from the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedRecord {
    pub name: String,
    pub save_path: String,
    pub timestamp: String,
}
