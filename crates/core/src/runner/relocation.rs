//! Relocation of finished torrents into their library directories.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::archive::TorrentArchive;
use crate::config::Config;
use crate::journal::Journal;
use crate::relocate::{wait_for_directory, Mover, TorrentMove};
use crate::torrent_client::{TorrentClient, TorrentClientError, TorrentStatus};

use super::RunError;

/// Counts from one relocation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationSummary {
    /// Finished torrents looked at.
    pub examined: usize,
    /// Torrents moved, archived and removed from the session.
    pub removed: usize,
    /// Finished torrents left in the session.
    pub skipped: usize,
}

/// Moves finished torrents out of the download categories.
///
/// Torrents are handled one at a time. A torrent leaves the session only when
/// its `.torrent` file is archived and at least one of its entries moved.
pub struct RelocationPass {
    client: Arc<dyn TorrentClient>,
    config: Config,
    archive: TorrentArchive,
    mover: Mover,
    journal: Arc<dyn Journal>,
    wait_timeout: Duration,
    wait_interval: Duration,
}

impl RelocationPass {
    pub fn new(client: Arc<dyn TorrentClient>, config: &Config, journal: Arc<dyn Journal>) -> Self {
        Self {
            client,
            config: config.clone(),
            archive: TorrentArchive::new(&config.archive, journal.clone()),
            mover: Mover::new(journal.clone()),
            journal,
            wait_timeout: Duration::from_secs(config.mover.dest_wait_timeout_secs),
            wait_interval: Duration::from_secs(config.mover.dest_wait_interval_secs),
        }
    }

    fn log(&self, message: String) {
        self.journal.record(&message);
    }

    /// Run one pass. Only a failure to list torrents is returned.
    pub async fn run(&self) -> Result<RelocationSummary, RunError> {
        self.log("Run started".to_string());
        let torrents = self.client.list_torrents().await?;

        let mut summary = RelocationSummary::default();
        for torrent in torrents.iter().filter(|t| t.is_finished) {
            summary.examined += 1;
            match self.process(torrent).await {
                Ok(true) => summary.removed += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    self.log(format!("Error processing '{}': {}", torrent.name, e));
                    summary.skipped += 1;
                }
            }
        }

        if summary.removed == 0 {
            self.log("No torrents processed.".to_string());
        }
        info!(
            "Relocation pass done: {} finished, {} removed, {} skipped",
            summary.examined, summary.removed, summary.skipped
        );
        Ok(summary)
    }

    /// Handle one finished torrent. Returns whether it left the session.
    async fn process(&self, torrent: &TorrentStatus) -> Result<bool, TorrentClientError> {
        let Some(category) = self.config.category_for(&torrent.save_path) else {
            self.log(format!(
                "Skipped '{}' (outside monitored dirs, save_path={})",
                torrent.name,
                torrent.save_path.display()
            ));
            return Ok(false);
        };

        if !wait_for_directory(&category.final_dir, self.wait_timeout, self.wait_interval).await {
            self.log(format!(
                "Destination {} unavailable, skipping '{}'",
                category.final_dir.display(),
                torrent.name
            ));
            return Ok(false);
        }

        self.log(format!(
            "Starting transfer for '{}' (ID: {}) to '{}'",
            torrent.name,
            torrent.id,
            category.final_dir.display()
        ));

        let archived = self.archive.archive(&torrent.id, &torrent.name).await;
        let report = self
            .mover
            .move_torrent_contents(&TorrentMove {
                id: &torrent.id,
                name: &torrent.name,
                save_path: &torrent.save_path,
                download_root: &category.download_dir,
                final_root: &category.final_dir,
                files: &torrent.files,
            })
            .await;
        let moved = report.moved_any();

        if archived && moved {
            self.client.remove_torrent(&torrent.id, false).await?;
            self.log(format!("Removed '{}'", torrent.name));
            Ok(true)
        } else {
            self.log(format!(
                "Skipped removal for '{}' (archived={}, moved={})",
                torrent.name, archived, moved
            ));
            Ok(false)
        }
    }
}
