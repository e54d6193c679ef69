//! Torrent client abstraction.
//!
//! This module provides a `TorrentClient` trait for querying and controlling
//! the torrent session, the Deluge backend, and the normalization adapter that
//! turns raw session answers into typed [`TorrentStatus`] records.

mod deluge;
pub mod normalize;
mod types;

pub use deluge::DelugeClient;
pub use types::*;
