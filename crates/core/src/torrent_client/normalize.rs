//! Normalization of loosely typed session responses into [`TorrentStatus`].
//!
//! Deluge answers `core.get_torrents_status` with a map of torrent id to a
//! field map. Depending on the daemon version and transport, text values can
//! arrive as JSON strings or as arrays of raw bytes, numbers as strings, and
//! fields can be missing entirely. Everything downstream only ever sees the
//! typed record produced here.

use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::debug;

use super::{FileEntry, TorrentClientError, TorrentState, TorrentStatus};

/// Status keys requested from the session.
pub const STATUS_KEYS: &[&str] = &[
    "name",
    "state",
    "message",
    "tracker_status",
    "save_path",
    "is_finished",
    "files",
];

/// Parse a full `id -> fields` status response.
///
/// Torrents are returned sorted by id so that iteration order is stable.
pub fn parse_status_map(value: Value) -> Result<Vec<TorrentStatus>, TorrentClientError> {
    let Value::Object(torrents) = value else {
        return Err(TorrentClientError::ApiError(format!(
            "expected an object of torrents, got {}",
            kind(&value)
        )));
    };

    let mut statuses: Vec<TorrentStatus> = torrents
        .iter()
        .filter_map(|(id, fields)| match fields {
            Value::Object(fields) => Some(normalize_status(id, fields)),
            other => {
                debug!("Ignoring torrent {} with non-object status ({})", id, kind(other));
                None
            }
        })
        .collect();
    statuses.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(statuses)
}

/// Build a typed status from one field map.
pub fn normalize_status(id: &str, fields: &Map<String, Value>) -> TorrentStatus {
    TorrentStatus {
        id: id.to_string(),
        name: text(fields.get("name")),
        state: TorrentState::from_deluge(&text(fields.get("state"))),
        message: text(fields.get("message")),
        tracker_status: text(fields.get("tracker_status")),
        save_path: PathBuf::from(text(fields.get("save_path"))),
        is_finished: flag(fields.get("is_finished")),
        files: files(fields.get("files")),
    }
}

/// Decode a text value that may be a string, a byte array or a scalar.
pub fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect();
            match bytes {
                Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                None => String::new(),
            }
        }
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Null) | Some(Value::Object(_)) | None => String::new(),
    }
}

fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(v @ (Value::String(_) | Value::Array(_))) => {
            matches!(text(Some(v)).to_ascii_lowercase().as_str(), "true" | "1")
        }
        _ => false,
    }
}

fn size(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
            .unwrap_or(0),
        Some(v) => text(Some(v)).trim().parse().unwrap_or(0),
        None => 0,
    }
}

/// Extract the file list, dropping entries without a usable path.
fn files(value: Option<&Value>) -> Vec<FileEntry> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let Value::Object(fields) = entry else {
                debug!("Dropping malformed file entry ({})", kind(entry));
                return None;
            };
            let path = text(fields.get("path"));
            if path.is_empty() {
                debug!("Dropping file entry without a path");
                return None;
            }
            Some(FileEntry {
                path,
                size: size(fields.get("size")),
            })
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_plain_strings() {
        let response = json!({
            "abc123": {
                "name": "Show.S01",
                "state": "Seeding",
                "message": "OK",
                "tracker_status": "Announce OK",
                "save_path": "/dl/tv",
                "is_finished": true,
                "files": [
                    {"index": 0, "path": "Show.S01/e01.mkv", "size": 100, "offset": 0},
                    {"index": 1, "path": "Show.S01/e02.mkv", "size": 200, "offset": 100}
                ]
            }
        });

        let statuses = parse_status_map(response).unwrap();
        assert_eq!(statuses.len(), 1);
        let status = &statuses[0];
        assert_eq!(status.id, "abc123");
        assert_eq!(status.name, "Show.S01");
        assert_eq!(status.state, TorrentState::Seeding);
        assert_eq!(status.save_path, PathBuf::from("/dl/tv"));
        assert!(status.is_finished);
        assert_eq!(status.files.len(), 2);
        assert_eq!(status.files[1], FileEntry::new("Show.S01/e02.mkv", 200));
    }

    #[test]
    fn test_normalize_byte_encoded_values() {
        // "Movie" and "/dl" as raw byte arrays
        let response = json!({
            "id1": {
                "name": [77, 111, 118, 105, 101],
                "state": [69, 114, 114, 111, 114],
                "save_path": [47, 100, 108],
                "is_finished": 1,
                "files": [{"path": [109, 46, 109, 107, 118], "size": "42"}]
            }
        });

        let status = &parse_status_map(response).unwrap()[0];
        assert_eq!(status.name, "Movie");
        assert_eq!(status.state, TorrentState::Error);
        assert_eq!(status.save_path, PathBuf::from("/dl"));
        assert!(status.is_finished);
        assert_eq!(status.files, vec![FileEntry::new("m.mkv", 42)]);
    }

    #[test]
    fn test_normalize_missing_fields_default() {
        let response = json!({ "id1": {} });
        let status = &parse_status_map(response).unwrap()[0];
        assert_eq!(status.name, "");
        assert_eq!(status.state, TorrentState::Unknown);
        assert!(!status.is_finished);
        assert!(status.files.is_empty());
        assert!(status.message.is_empty());
    }

    #[test]
    fn test_malformed_file_entries_are_dropped() {
        let response = json!({
            "id1": {
                "files": [
                    "not-an-object",
                    {"size": 5},
                    {"path": null},
                    {"path": "ok.txt"}
                ]
            }
        });
        let status = &parse_status_map(response).unwrap()[0];
        assert_eq!(status.files, vec![FileEntry::new("ok.txt", 0)]);
    }

    #[test]
    fn test_non_object_torrents_are_skipped_and_sorted() {
        let response = json!({
            "zzz": {"name": "last"},
            "bad": 5,
            "aaa": {"name": "first"}
        });
        let statuses = parse_status_map(response).unwrap();
        let ids: Vec<&str> = statuses.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["aaa", "zzz"]);
    }

    #[test]
    fn test_non_object_response_is_error() {
        assert!(parse_status_map(json!([1, 2, 3])).is_err());
    }
}
