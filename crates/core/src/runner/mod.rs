//! Passes driven by the command line.

mod relocation;

pub use relocation::{RelocationPass, RelocationSummary};

use thiserror::Error;

use crate::journal::JournalError;
use crate::torrent_client::TorrentClientError;

/// Failure of a whole pass.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Torrent session error: {0}")]
    Client(#[from] TorrentClientError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}
