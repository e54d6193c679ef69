//! Testing utilities and a mock torrent session.
//!
//! # Example
//!
//! ```rust,ignore
//! use steward_core::testing::{fixtures, MockTorrentClient};
//!
//! let client = MockTorrentClient::new();
//! client
//!     .add_mock_torrent(fixtures::finished_torrent("abc", "Show", "/dl/tv", &["Show/e1.mkv"]))
//!     .await;
//! ```

mod mock_torrent_client;

pub use mock_torrent_client::{MockTorrentClient, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::PathBuf;

    use crate::torrent_client::{FileEntry, TorrentState, TorrentStatus};

    /// A torrent in `state` with no files.
    pub fn torrent_in_state(
        id: &str,
        name: &str,
        save_path: impl Into<PathBuf>,
        state: TorrentState,
    ) -> TorrentStatus {
        TorrentStatus {
            id: id.to_string(),
            name: name.to_string(),
            state,
            message: String::new(),
            tracker_status: String::new(),
            save_path: save_path.into(),
            is_finished: matches!(state, TorrentState::Seeding | TorrentState::Finished),
            files: Vec::new(),
        }
    }

    /// A finished, seeding torrent with the given relative file paths.
    pub fn finished_torrent(
        id: &str,
        name: &str,
        save_path: impl Into<PathBuf>,
        files: &[&str],
    ) -> TorrentStatus {
        TorrentStatus {
            files: files.iter().map(|f| FileEntry::new(*f, 1024)).collect(),
            ..torrent_in_state(id, name, save_path, TorrentState::Seeding)
        }
    }

    /// A torrent in the `Error` state with `message`.
    pub fn errored_torrent(
        id: &str,
        name: &str,
        save_path: impl Into<PathBuf>,
        message: &str,
    ) -> TorrentStatus {
        TorrentStatus {
            message: message.to_string(),
            tracker_status: "Announce OK".to_string(),
            ..torrent_in_state(id, name, save_path, TorrentState::Error)
        }
    }
}
