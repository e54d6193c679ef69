//! Error recovery and queue upkeep for the whole session.
//!
//! One pass looks at every torrent once:
//! - errored torrents are resumed, and rechecked when a resume is not enough
//! - paused torrents fill free download slots
//! - finished torrents outside the monitored download dirs leave the session
//!
//! Every decision goes to the summary journal. Errors are also kept as JSON
//! records together with cumulative statistics.

mod mount;
mod stats;

pub use mount::{is_accessible, is_mounted_path, is_writable};
pub use stats::{CompletedRecord, ErrorRecord, ErrorStats};

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{info, warn};

use crate::config::{Config, RecoveryConfig};
use crate::journal::{append_json_records, JournalSet};
use crate::runner::RunError;
use crate::torrent_client::{TorrentClient, TorrentClientError, TorrentState, TorrentStatus};

/// Counts from one recovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    /// Torrents seen in the session.
    pub examined: usize,
    /// Torrents found in the `Error` state.
    pub errors: usize,
    /// Errored torrents that needed a forced recheck.
    pub rechecked: usize,
    /// Paused torrents resumed into free download slots.
    pub slot_resumed: usize,
    /// Finished torrents removed from the session.
    pub removed: usize,
}

/// Per-run accumulator.
#[derive(Default)]
struct PassState<'a> {
    downloading: u32,
    queued: usize,
    paused: Vec<&'a TorrentStatus>,
    to_remove: Vec<&'a TorrentStatus>,
    new_errors: Vec<ErrorRecord>,
}

/// Recovery pass over the torrent session.
pub struct RecoveryPass {
    client: Arc<dyn TorrentClient>,
    settings: RecoveryConfig,
    config: Config,
    journals: JournalSet,
    path_check: fn(&Path) -> bool,
}

impl RecoveryPass {
    pub fn new(client: Arc<dyn TorrentClient>, config: &Config, journals: JournalSet) -> Self {
        Self {
            client,
            settings: config.recovery.clone(),
            config: config.clone(),
            journals,
            path_check: is_accessible,
        }
    }

    /// Replace the save path accessibility check.
    pub fn with_path_check(mut self, check: fn(&Path) -> bool) -> Self {
        self.path_check = check;
        self
    }

    fn summary(&self, message: String) {
        self.journals.summary.record(&message);
    }

    fn resume_fix(&self, message: String) {
        self.journals.resume_fix.record(&message);
    }

    fn script_error(&self, message: String) {
        self.journals.script_errors.record(&message);
    }

    fn is_resume_error(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.settings
            .resume_error_patterns
            .iter()
            .any(|pattern| message.contains(&pattern.to_lowercase()))
    }

    fn is_monitored(&self, save_path: &Path) -> bool {
        self.config.category_for(save_path).is_some()
    }

    async fn max_active(&self) -> u32 {
        match self.client.max_active_downloading().await {
            Ok(Some(max)) => max,
            Ok(None) => self.settings.max_active_downloads_default,
            Err(e) => {
                warn!("Could not read max_active_downloading: {}", e);
                self.settings.max_active_downloads_default
            }
        }
    }

    /// Run one pass. Only a failure to list torrents or to write the record
    /// files is returned; per-torrent failures go to the script error log.
    pub async fn run(&self) -> Result<RecoverySummary, RunError> {
        let max_active = self.max_active().await;
        let torrents = self.client.list_torrents().await?;
        let records = &self.journals.records;
        let mut stats = match ErrorStats::load(&records.stats) {
            Ok(stats) => stats,
            Err(e) => {
                self.script_error(format!("Error statistics reset, could not load them: {}", e));
                ErrorStats::default()
            }
        };
        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let mut summary = RecoverySummary {
            examined: torrents.len(),
            ..Default::default()
        };
        let mut pass = PassState::default();

        for torrent in &torrents {
            match torrent.state {
                TorrentState::Downloading => pass.downloading += 1,
                TorrentState::Paused => pass.paused.push(torrent),
                TorrentState::Queued => pass.queued += 1,
                _ => {}
            }

            match torrent.state {
                TorrentState::Error => {
                    summary.errors += 1;
                    stats.record(&torrent.name, &torrent.message);
                    pass.new_errors.push(ErrorRecord {
                        name: torrent.name.clone(),
                        save_path: torrent.save_path.display().to_string(),
                        message: torrent.message.clone(),
                        tracker_status: torrent.tracker_status.clone(),
                        timestamp: now.clone(),
                    });
                    match self.recover(torrent).await {
                        Ok(rechecked) => summary.rechecked += usize::from(rechecked),
                        Err(e) => self.script_error(format!(
                            "Error recovering '{}': {}",
                            torrent.name, e
                        )),
                    }
                }
                TorrentState::Seeding | TorrentState::Finished => {
                    if self.settings.allow_seeding && torrent.state == TorrentState::Seeding {
                        self.summary(format!("{}: Seeding | Allowed to stay", torrent.name));
                    } else if self.is_monitored(&torrent.save_path) {
                        self.summary(format!(
                            "{}: {} | Left for relocation",
                            torrent.name, torrent.state
                        ));
                    } else {
                        self.summary(format!(
                            "{}: {} | Queued for removal",
                            torrent.name, torrent.state
                        ));
                        pass.to_remove.push(torrent);
                    }
                }
                state => {
                    self.summary(format!("{}: {} | No action needed", torrent.name, state));
                }
            }
        }

        summary.slot_resumed = self.fill_free_slots(max_active, &pass).await;
        let completed = self.remove_finished(&pass.to_remove, &now).await;
        summary.removed = completed.len();

        append_json_records(&records.completed, &completed)?;
        if !pass.new_errors.is_empty() {
            append_json_records(&records.errors, &pass.new_errors)?;
            stats.save(&records.stats)?;
        }

        info!(
            "Recovery pass done: {} torrents, {} errors, {} rechecked, {} resumed, {} removed",
            summary.examined,
            summary.errors,
            summary.rechecked,
            summary.slot_resumed,
            summary.removed
        );
        Ok(summary)
    }

    /// Try to bring an errored torrent back. Returns whether a recheck was forced.
    async fn recover(&self, torrent: &TorrentStatus) -> Result<bool, TorrentClientError> {
        let name = &torrent.name;
        let message = &torrent.message;
        let ids = [torrent.id.clone()];

        if !self.is_resume_error(message) {
            self.client.resume_torrents(&ids).await?;
            self.summary(format!(
                "{}: ERROR - {} | General error | Resumed",
                name, message
            ));
            return Ok(false);
        }

        self.resume_fix(format!("{}: {}", name, message));
        if !(self.path_check)(&torrent.save_path) {
            self.resume_fix(format!("{}: Path not mounted or writable. Skipping.", name));
            self.summary(format!(
                "{}: ERROR - {} | Path inaccessible | Skipped",
                name, message
            ));
            return Ok(false);
        }

        self.resume_fix(format!(
            "{}: Drive is accessible. Trying resume only first.",
            name
        ));
        self.client.resume_torrents(&ids).await?;
        tokio::time::sleep(Duration::from_secs(self.settings.resume_settle_secs)).await;

        let refreshed = self.client.get_torrent(&torrent.id).await?;
        if refreshed.state == TorrentState::Error {
            self.resume_fix(format!("{}: Still in error. Forcing recheck.", name));
            self.client.force_recheck(&ids).await?;
            self.client.resume_torrents(&ids).await?;
            self.summary(format!(
                "{}: ERROR - {} | Recheck triggered after failed resume",
                name, message
            ));
            Ok(true)
        } else {
            self.resume_fix(format!("{}: Resumed successfully. No recheck needed.", name));
            self.summary(format!(
                "{}: ERROR - {} | Recovered with resume only",
                name, message
            ));
            Ok(false)
        }
    }

    /// Resume paused torrents while download slots are free and nothing is queued.
    async fn fill_free_slots(&self, max_active: u32, pass: &PassState<'_>) -> usize {
        let slots = max_active.saturating_sub(pass.downloading) as usize;
        if slots == 0 || pass.queued > 0 || pass.paused.is_empty() {
            return 0;
        }

        let chosen: Vec<&TorrentStatus> = pass.paused.iter().take(slots).copied().collect();
        let ids: Vec<String> = chosen.iter().map(|t| t.id.clone()).collect();
        if let Err(e) = self.client.resume_torrents(&ids).await {
            self.script_error(format!("Error resuming paused torrents: {}", e));
            return 0;
        }
        for torrent in &chosen {
            self.summary(format!(
                "{}: Paused | Resumed due to available slot",
                torrent.name
            ));
        }
        chosen.len()
    }

    /// Remove queued torrents that are still in the session.
    async fn remove_finished(
        &self,
        to_remove: &[&TorrentStatus],
        now: &str,
    ) -> Vec<CompletedRecord> {
        if to_remove.is_empty() {
            return Vec::new();
        }

        let active: HashSet<String> = match self.client.session_torrent_ids().await {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                self.script_error(format!("Error reading session torrents: {}", e));
                return Vec::new();
            }
        };

        let mut completed = Vec::new();
        for torrent in to_remove.iter().filter(|t| active.contains(&t.id)) {
            match self.client.remove_torrent(&torrent.id, false).await {
                Ok(()) => {
                    self.summary(format!("{}: Removed from session", torrent.name));
                    completed.push(CompletedRecord {
                        name: torrent.name.clone(),
                        save_path: torrent.save_path.display().to_string(),
                        timestamp: now.to_string(),
                    });
                }
                Err(e) => {
                    self.script_error(format!("Error removing '{}': {}", torrent.name, e))
                }
            }
        }
        completed
    }
}
