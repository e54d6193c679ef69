//! Archive of `.torrent` metadata files for torrents leaving the session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tokio::fs;

use crate::config::ArchiveConfig;
use crate::journal::Journal;

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:"*?<>|]+"#).expect("valid regex"));

/// Make a torrent name safe for use in a file name.
///
/// Trims surrounding whitespace and collapses each run of path separators and
/// characters reserved on Windows into a single `_`.
pub fn sanitize_filename(name: &str) -> String {
    UNSAFE_CHARS.replace_all(name.trim(), "_").into_owned()
}

/// Copies `.torrent` files out of the Deluge state directory.
pub struct TorrentArchive {
    dir: PathBuf,
    state_dir: PathBuf,
    journal: Arc<dyn Journal>,
}

impl TorrentArchive {
    pub fn new(config: &ArchiveConfig, journal: Arc<dyn Journal>) -> Self {
        Self {
            dir: config.dir.clone(),
            state_dir: config.state_dir.clone(),
            journal,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<sanitized name>_<id>.torrent`
    pub fn archive_path(&self, id: &str, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.torrent", sanitize_filename(name), id))
    }

    /// Archive the metadata of one torrent.
    ///
    /// Returns true when an archived copy exists afterwards. An existing copy
    /// is never replaced. A missing state file or an I/O error returns false.
    pub async fn archive(&self, id: &str, name: &str) -> bool {
        let target = self.archive_path(id, name);
        if fs::try_exists(&target).await.unwrap_or(false) {
            self.journal.record(&format!(
                "Using previously archived .torrent, skipping copy: {}",
                target.display()
            ));
            return true;
        }

        let source = self.state_dir.join(format!("{}.torrent", id));
        if !fs::try_exists(&source).await.unwrap_or(false) {
            self.journal.record(&format!(
                ".torrent for '{}' ({}) missing, skipping archive.",
                name, id
            ));
            return false;
        }

        let copied = async {
            fs::create_dir_all(&self.dir).await?;
            fs::copy(&source, &target).await
        }
        .await;

        match copied {
            Ok(_) => {
                self.journal.record(&format!(
                    "Copied .torrent from {} to {}",
                    source.display(),
                    target.display()
                ));
                true
            }
            Err(e) => {
                self.journal
                    .record(&format!("Error archiving .torrent for {}: {}", name, e));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::MemoryJournal;
    use tempfile::TempDir;

    fn archive_in(temp: &TempDir) -> (TorrentArchive, Arc<MemoryJournal>) {
        let journal = Arc::new(MemoryJournal::new());
        let config = ArchiveConfig {
            dir: temp.path().join("archive"),
            state_dir: temp.path().join("state"),
        };
        std::fs::create_dir_all(&config.state_dir).unwrap();
        (TorrentArchive::new(&config, journal.clone()), journal)
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("  Show: S01/E02  "), "Show_ S01_E02");
        assert_eq!(sanitize_filename(r#"a<>b"c|d?*e\f"#), "a_b_c_d_e_f");
        assert_eq!(sanitize_filename("Movie (2020) [1080p]"), "Movie (2020) [1080p]");
    }

    #[test]
    fn test_archive_path_layout() {
        let temp = TempDir::new().unwrap();
        let (archive, _) = archive_in(&temp);
        assert_eq!(
            archive.archive_path("abc123", "My: Show"),
            temp.path().join("archive/My_ Show_abc123.torrent")
        );
    }

    #[tokio::test]
    async fn test_archive_copies_state_file() {
        let temp = TempDir::new().unwrap();
        let (archive, journal) = archive_in(&temp);
        std::fs::write(temp.path().join("state/abc.torrent"), b"d4:infoe").unwrap();

        assert!(archive.archive("abc", "Show").await);
        let target = archive.archive_path("abc", "Show");
        assert_eq!(std::fs::read(&target).unwrap(), b"d4:infoe");
        assert!(journal.contains("Copied .torrent from"));
    }

    #[tokio::test]
    async fn test_archive_keeps_existing_copy() {
        let temp = TempDir::new().unwrap();
        let (archive, journal) = archive_in(&temp);
        let target = archive.archive_path("abc", "Show");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"old").unwrap();
        std::fs::write(temp.path().join("state/abc.torrent"), b"new").unwrap();

        assert!(archive.archive("abc", "Show").await);
        assert_eq!(std::fs::read(&target).unwrap(), b"old");
        assert!(journal.contains("Using previously archived .torrent"));
    }

    #[tokio::test]
    async fn test_archive_missing_state_file() {
        let temp = TempDir::new().unwrap();
        let (archive, journal) = archive_in(&temp);

        assert!(!archive.archive("gone", "Lost Show").await);
        assert!(journal.contains(".torrent for 'Lost Show' (gone) missing"));
        assert!(!archive.dir().exists());
    }
}
