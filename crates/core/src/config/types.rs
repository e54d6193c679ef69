use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub deluge: DelugeConfig,
    /// Download categories, checked in order.
    pub categories: Vec<CategoryConfig>,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub mover: MoverConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

impl Config {
    /// Returns the first category whose download directory contains `save_path`.
    pub fn category_for(&self, save_path: &std::path::Path) -> Option<&CategoryConfig> {
        self.categories
            .iter()
            .find(|c| crate::relocate::is_within(save_path, &c.download_dir))
    }
}

/// Deluge Web JSON-RPC connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DelugeConfig {
    /// Base URL of deluge-web (e.g., "http://localhost:8112")
    #[serde(default = "default_deluge_url")]
    pub url: String,
    /// deluge-web password
    #[serde(default = "default_deluge_password")]
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Daemon host id to connect to when the web UI is not connected.
    /// Falls back to the first host known to deluge-web.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
}

impl Default for DelugeConfig {
    fn default() -> Self {
        Self {
            url: default_deluge_url(),
            password: default_deluge_password(),
            timeout_secs: default_timeout(),
            host_id: None,
        }
    }
}

fn default_deluge_url() -> String {
    "http://localhost:8112".to_string()
}

fn default_deluge_password() -> String {
    "deluge".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// A download category: where Deluge stages files and where they end up.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CategoryConfig {
    /// Display name (e.g., "TV", "Movies")
    pub name: String,
    /// Shared staging root that Deluge writes into
    pub download_dir: PathBuf,
    /// Final library directory
    pub final_dir: PathBuf,
}

/// Torrent metadata archive settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    /// Directory that receives archived .torrent files
    #[serde(default = "default_archive_dir")]
    pub dir: PathBuf,
    /// Deluge state directory holding `<id>.torrent` files
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir: default_archive_dir(),
            state_dir: default_state_dir(),
        }
    }
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("torrent_archive")
}

fn default_state_dir() -> PathBuf {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(".config").join("deluge").join("state")
}

/// Mover settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MoverConfig {
    /// How long to wait for a destination mount to respond (seconds).
    #[serde(default = "default_wait_timeout")]
    pub dest_wait_timeout_secs: u64,
    /// Delay between readiness probes (seconds).
    #[serde(default = "default_wait_interval")]
    pub dest_wait_interval_secs: u64,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            dest_wait_timeout_secs: default_wait_timeout(),
            dest_wait_interval_secs: default_wait_interval(),
        }
    }
}

fn default_wait_timeout() -> u64 {
    30
}

fn default_wait_interval() -> u64 {
    2
}

/// Error recovery and queue policy settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecoveryConfig {
    /// Used when the session does not report `max_active_downloading`.
    #[serde(default = "default_max_active")]
    pub max_active_downloads_default: u32,
    /// Keep seeding torrents in the session.
    #[serde(default = "default_true")]
    pub allow_seeding: bool,
    /// How long to let a resumed torrent settle before re-checking its state (seconds).
    #[serde(default = "default_settle")]
    pub resume_settle_secs: u64,
    /// Case-insensitive substrings marking errors that a resume/recheck can fix.
    #[serde(default = "default_resume_patterns")]
    pub resume_error_patterns: Vec<String>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_active_downloads_default: default_max_active(),
            allow_seeding: true,
            resume_settle_secs: default_settle(),
            resume_error_patterns: default_resume_patterns(),
        }
    }
}

fn default_max_active() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_settle() -> u64 {
    60
}

fn default_resume_patterns() -> Vec<String> {
    vec![
        "resume data".to_string(),
        "bad address".to_string(),
        "resource temporarily unavailable".to_string(),
    ]
}

/// Where journal files are written
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JournalConfig {
    #[serde(default = "default_journal_dir")]
    pub dir: PathBuf,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            dir: default_journal_dir(),
        }
    }
}

fn default_journal_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Sanitized config for display (password redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub deluge: SanitizedDelugeConfig,
    pub categories: Vec<CategoryConfig>,
    pub archive: ArchiveConfig,
    pub mover: MoverConfig,
    pub recovery: RecoveryConfig,
    pub journal: JournalConfig,
}

/// Sanitized Deluge config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDelugeConfig {
    pub url: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            deluge: SanitizedDelugeConfig {
                url: config.deluge.url.clone(),
                password_configured: !config.deluge.password.is_empty(),
                timeout_secs: config.deluge.timeout_secs,
                host_id: config.deluge.host_id.clone(),
            },
            categories: config.categories.clone(),
            archive: config.archive.clone(),
            mover: config.mover.clone(),
            recovery: config.recovery.clone(),
            journal: config.journal.clone(),
        }
    }
}
