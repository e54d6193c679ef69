//! Safe relocation of finished torrents out of shared download directories.
//!
//! Several torrents may share one download root. Relocation therefore moves
//! only the top-level entries named by a torrent's own file list, never the
//! whole save path:
//!
//! - [`resolve`] maps a save path onto its destination under the library root.
//! - [`select_top_components`] picks the entries that belong to the torrent.
//! - [`Mover`] moves them, replacing conflicts, and prunes empty directories
//!   without ever removing the download root.

mod error;
mod mover;
mod resolver;
mod selector;
mod wait;

pub use error::RelocateError;
pub use mover::{MoveReport, Mover, SkipReason, TorrentMove};
pub use resolver::{is_within, normalize_path, resolve, RelativeRoot};
pub use selector::select_top_components;
pub use wait::wait_for_directory;
