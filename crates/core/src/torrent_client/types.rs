//! Types for torrent client operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("No daemon host available: {0}")]
    NoHost(String),

    #[error("RPC error in {method}: {message}")]
    Rpc { method: String, message: String },

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,
}

/// State of a torrent as reported by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Downloading from peers.
    Downloading,
    /// Seeding to peers.
    Seeding,
    /// Finished downloading, not seeding.
    Finished,
    /// Download or upload is paused.
    Paused,
    /// Checking file integrity.
    Checking,
    /// Waiting for a free active slot.
    Queued,
    /// Pre-allocating disk space.
    Allocating,
    /// Moving storage.
    Moving,
    /// Error state.
    Error,
    /// Unknown state.
    Unknown,
}

impl TorrentState {
    /// Returns the string representation used in journal lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentState::Downloading => "Downloading",
            TorrentState::Seeding => "Seeding",
            TorrentState::Finished => "Finished",
            TorrentState::Paused => "Paused",
            TorrentState::Checking => "Checking",
            TorrentState::Queued => "Queued",
            TorrentState::Allocating => "Allocating",
            TorrentState::Moving => "Moving",
            TorrentState::Error => "Error",
            TorrentState::Unknown => "Unknown",
        }
    }

    /// Parse a Deluge state string.
    pub fn from_deluge(state: &str) -> Self {
        match state {
            "Downloading" => TorrentState::Downloading,
            "Seeding" => TorrentState::Seeding,
            "Finished" => TorrentState::Finished,
            "Paused" => TorrentState::Paused,
            "Checking" => TorrentState::Checking,
            "Queued" => TorrentState::Queued,
            "Allocating" => TorrentState::Allocating,
            "Moving" => TorrentState::Moving,
            "Error" => TorrentState::Error,
            _ => TorrentState::Unknown,
        }
    }
}

impl std::fmt::Display for TorrentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file belonging to a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the torrent's own root. The first segment is the
    /// torrent's top-level folder (multi-file) or the file itself.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// Normalized status of one torrent in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentStatus {
    /// Info hash as reported by the session.
    pub id: String,
    /// Torrent name.
    pub name: String,
    /// Current state.
    pub state: TorrentState,
    /// Error or status message (empty when none).
    #[serde(default)]
    pub message: String,
    /// Last tracker status line (empty when none).
    #[serde(default)]
    pub tracker_status: String,
    /// Directory the session writes this torrent into.
    pub save_path: PathBuf,
    /// Whether all wanted pieces are downloaded.
    pub is_finished: bool,
    /// Files belonging to this torrent.
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

/// Trait for torrent session backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// List all torrents in the session.
    async fn list_torrents(&self) -> Result<Vec<TorrentStatus>, TorrentClientError>;

    /// Get a specific torrent by id.
    async fn get_torrent(&self, id: &str) -> Result<TorrentStatus, TorrentClientError>;

    /// Resume the given torrents.
    async fn resume_torrents(&self, ids: &[String]) -> Result<(), TorrentClientError>;

    /// Pause the given torrents.
    async fn pause_torrents(&self, ids: &[String]) -> Result<(), TorrentClientError>;

    /// Force an integrity recheck of the given torrents.
    async fn force_recheck(&self, ids: &[String]) -> Result<(), TorrentClientError>;

    /// Remove a torrent from the session.
    /// If `remove_data` is true, also delete downloaded files.
    async fn remove_torrent(&self, id: &str, remove_data: bool) -> Result<(), TorrentClientError>;

    /// Ids of every torrent currently known to the session.
    async fn session_torrent_ids(&self) -> Result<Vec<String>, TorrentClientError>;

    /// Maximum number of concurrently downloading torrents, if the session reports one.
    async fn max_active_downloading(&self) -> Result<Option<u32>, TorrentClientError>;
}
