//! Append-only operator journals.
//!
//! A [`Journal`] receives human-readable event lines. Failures to record are
//! logged and swallowed so that bookkeeping never aborts maintenance work.
//! [`FileJournal`] writes timestamped lines to disk, [`MemoryJournal`] keeps
//! them in memory for tests.

mod file;
mod records;

pub use file::FileJournal;
pub use records::{append_json_records, read_json, write_json};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;
use thiserror::Error;

/// Errors from journal and record file I/O.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error on {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl JournalError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Sink for journal lines.
pub trait Journal: Send + Sync {
    /// Record one event line.
    fn record(&self, message: &str);
}

/// Format a journal line with the local timestamp prefix.
pub fn timestamped(message: &str) -> String {
    format!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message)
}

/// In-memory journal, mostly useful for tests.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    entries: Mutex<Vec<String>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines, without timestamps.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.contains(needle))
    }

    /// Number of lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.entries().iter().filter(|e| e.contains(needle)).count()
    }
}

impl Journal for MemoryJournal {
    fn record(&self, message: &str) {
        tracing::debug!("{}", message);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(message.to_string());
        }
    }
}

/// File names used inside the journal directory.
pub mod files {
    pub const RELOCATION: &str = "torrent_manager.log";
    pub const SUMMARY: &str = "summary.log";
    pub const RESUME_FIX: &str = "resume_data_fix.log";
    pub const SCRIPT_ERRORS: &str = "script_errors.log";
    pub const ERRORS: &str = "errors.log";
    pub const COMPLETED: &str = "completed.log";
    pub const STATS: &str = "stats.json";
}

/// Locations of the structured record files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFiles {
    /// Pretty JSON error records, appended.
    pub errors: PathBuf,
    /// Pretty JSON records of torrents removed from the session, appended.
    pub completed: PathBuf,
    /// Cumulative error statistics, rewritten each run.
    pub stats: PathBuf,
}

impl RecordFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            errors: dir.join(files::ERRORS),
            completed: dir.join(files::COMPLETED),
            stats: dir.join(files::STATS),
        }
    }
}

/// Every journal a run writes to.
#[derive(Clone)]
pub struct JournalSet {
    pub relocation: Arc<dyn Journal>,
    pub summary: Arc<dyn Journal>,
    pub resume_fix: Arc<dyn Journal>,
    pub script_errors: Arc<dyn Journal>,
    pub records: RecordFiles,
}

impl JournalSet {
    /// Open file journals inside `dir`, creating it if needed.
    pub fn open(dir: &Path) -> Result<Self, JournalError> {
        std::fs::create_dir_all(dir).map_err(|e| JournalError::io(dir, e))?;
        Ok(Self {
            relocation: Arc::new(FileJournal::new(dir.join(files::RELOCATION))),
            summary: Arc::new(FileJournal::new(dir.join(files::SUMMARY))),
            resume_fix: Arc::new(FileJournal::new(dir.join(files::RESUME_FIX))),
            script_errors: Arc::new(FileJournal::new(dir.join(files::SCRIPT_ERRORS))),
            records: RecordFiles::in_dir(dir),
        })
    }
}
