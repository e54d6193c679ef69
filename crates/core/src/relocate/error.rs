//! Error types for the relocate module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while relocating one top-level entry.
///
/// None of these abort a batch; they are journaled per component.
#[derive(Debug, Error)]
pub enum RelocateError {
    /// Failed to create the destination directory.
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove a conflicting destination entry.
    #[error("Error removing existing {path}: {source}")]
    RemoveExistingFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move/rename an entry.
    #[error("Error moving {source_path} -> {destination}: {error}")]
    MoveFailed {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Cross-device fallback copy failed.
    #[error("Error copying {source_path} -> {destination}: {reason}")]
    CopyFailed {
        source_path: PathBuf,
        destination: PathBuf,
        reason: String,
    },

    /// The copy succeeded but the source could not be deleted.
    #[error("Copied {source_path} but failed to delete it: {error}")]
    SourceCleanupFailed {
        source_path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

impl RelocateError {
    /// Creates a move failed error.
    pub fn move_failed(source_path: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed {
            source_path,
            destination,
            error,
        }
    }

    /// Creates a copy failed error.
    pub fn copy_failed(source_path: PathBuf, destination: PathBuf, reason: impl ToString) -> Self {
        Self::CopyFailed {
            source_path,
            destination,
            reason: reason.to_string(),
        }
    }
}
