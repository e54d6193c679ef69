pub mod archive;
pub mod config;
pub mod journal;
pub mod recovery;
pub mod relocate;
pub mod runner;
pub mod testing;
pub mod torrent_client;

pub use archive::{sanitize_filename, TorrentArchive};
pub use config::{
    load_config, load_config_from_str, validate_config, CategoryConfig, Config, ConfigError,
    SanitizedConfig,
};
pub use journal::{FileJournal, Journal, JournalError, JournalSet, MemoryJournal};
pub use recovery::{RecoveryPass, RecoverySummary};
pub use relocate::{MoveReport, Mover, RelocateError, TorrentMove};
pub use runner::{RelocationPass, RelocationSummary, RunError};
pub use torrent_client::{
    DelugeClient, FileEntry, TorrentClient, TorrentClientError, TorrentState, TorrentStatus,
};
