//! File-backed journal.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{timestamped, Journal, JournalError};

/// Journal appending timestamped lines to a file.
///
/// Every line is written through immediately, so an interrupted run keeps
/// everything recorded up to that point. Lines are mirrored to `tracing`.
#[derive(Debug, Clone)]
pub struct FileJournal {
    path: PathBuf,
}

impl FileJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> Result<(), JournalError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| JournalError::io(&self.path, e))?;
        writeln!(file, "{}", line).map_err(|e| JournalError::io(&self.path, e))
    }
}

impl Journal for FileJournal {
    fn record(&self, message: &str) {
        tracing::info!("{}", message);
        if let Err(e) = self.append(&timestamped(message)) {
            tracing::warn!("Failed to write journal line: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_journal_appends_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.log");
        std::fs::write(&path, "existing\n").unwrap();

        let journal = FileJournal::new(&path);
        journal.record("Moved a -> b");
        journal.record("Removed 'x'");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "existing");
        assert!(lines[1].ends_with("] Moved a -> b"));
        assert!(lines[2].ends_with("] Removed 'x'"));
    }

    #[test]
    fn test_file_journal_tolerates_missing_dir() {
        let temp = TempDir::new().unwrap();
        let journal = FileJournal::new(temp.path().join("missing/run.log"));
        // Must not panic
        journal.record("lost line");
        assert!(!journal.path().exists());
    }
}
