//! Structured JSON record files.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::JournalError;

/// Append records as pretty-printed JSON, each followed by a blank line.
pub fn append_json_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), JournalError> {
    if records.is_empty() {
        return Ok(());
    }

    let mut out = String::new();
    for record in records {
        let json = serde_json::to_string_pretty(record).map_err(|e| {
            JournalError::Serialization {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        out.push_str(&json);
        out.push_str("\n\n");
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| JournalError::io(path, e))?;
    file.write_all(out.as_bytes())
        .map_err(|e| JournalError::io(path, e))
}

/// Read a JSON document, returning `None` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, JournalError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(JournalError::io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| JournalError::Serialization {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Replace a JSON document.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), JournalError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| JournalError::Serialization {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json).map_err(|e| JournalError::io(path, e))
}
