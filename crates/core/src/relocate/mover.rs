//! Moves a torrent's top-level entries out of a shared download directory.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use super::error::RelocateError;
use super::resolver::{is_within, normalize_path, resolve};
use super::selector::select_top_components;
use crate::journal::Journal;
use crate::torrent_client::FileEntry;

/// Why a move was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The save path is not inside the category's download root.
    OutsideDownloadRoot,
    /// The torrent reported no usable files.
    NoComponents,
    /// The destination directory could not be created.
    DestinationUnavailable,
}

/// Outcome of moving one torrent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveReport {
    /// Destination directory, when one was resolved.
    pub destination: Option<PathBuf>,
    /// Set when nothing was attempted.
    pub skipped: Option<SkipReason>,
    /// Destination paths of relocated entries.
    pub moved: Vec<PathBuf>,
    /// Source paths that did not exist.
    pub missing: Vec<PathBuf>,
    /// Destination paths removed to make room.
    pub overwritten: Vec<PathBuf>,
    /// Source paths that could not be relocated.
    pub failed: Vec<PathBuf>,
    /// Sources copied to the destination but not deleted afterwards.
    pub leftover: Vec<PathBuf>,
    /// Empty directories removed by the cleanup pass.
    pub removed_dirs: Vec<PathBuf>,
}

impl MoveReport {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Default::default()
        }
    }

    /// Whether at least one entry was relocated.
    pub fn moved_any(&self) -> bool {
        !self.moved.is_empty()
    }
}

/// Everything needed to move one torrent.
#[derive(Debug, Clone, Copy)]
pub struct TorrentMove<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub save_path: &'a Path,
    pub download_root: &'a Path,
    pub final_root: &'a Path,
    pub files: &'a [FileEntry],
}

/// Filesystem mover. Every decision and failure is written to the journal.
pub struct Mover {
    journal: Arc<dyn Journal>,
}

impl Mover {
    pub fn new(journal: Arc<dyn Journal>) -> Self {
        Self { journal }
    }

    fn log(&self, message: String) {
        self.journal.record(&message);
    }

    /// Move only the entries belonging to one torrent into its destination.
    ///
    /// - The destination is `final_root` when the torrent sits directly in the
    ///   download root, `final_root/<relative save path>` otherwise.
    /// - Conflicting destination entries are replaced.
    /// - Empty directories left behind are removed up to, never including,
    ///   the download root.
    pub async fn move_torrent_contents(&self, request: &TorrentMove<'_>) -> MoveReport {
        let Some(relative) = resolve(request.save_path, request.download_root) else {
            self.log(format!(
                "Skipped move: {} not under {}",
                request.save_path.display(),
                request.download_root.display()
            ));
            return MoveReport::skipped(SkipReason::OutsideDownloadRoot);
        };

        let components = select_top_components(request.files);
        if components.is_empty() {
            self.log(format!(
                "No file list found for '{}' ({}); nothing to move.",
                request.name, request.id
            ));
            return MoveReport::skipped(SkipReason::NoComponents);
        }

        let save_path = normalize_path(request.save_path);
        let destination = relative.destination_under(request.final_root);
        let mut report = self
            .move_components(request.name, &save_path, &destination, &components)
            .await;

        if report.skipped.is_none() && !relative.is_shared_root() {
            report.removed_dirs = self
                .cleanup_empty_parents(&save_path, request.download_root)
                .await;
        }
        report
    }

    /// Relocate each named entry of `save_path` into `destination_dir`.
    ///
    /// The destination directory is created first, whether or not any
    /// source exists. Failures are per component and never stop the batch.
    pub async fn move_components(
        &self,
        name: &str,
        save_path: &Path,
        destination_dir: &Path,
        components: &BTreeSet<String>,
    ) -> MoveReport {
        let mut report = MoveReport {
            destination: Some(destination_dir.to_path_buf()),
            ..Default::default()
        };

        if let Err(e) = fs::create_dir_all(destination_dir).await {
            let err = RelocateError::DirectoryCreationFailed {
                path: destination_dir.to_path_buf(),
                source: e,
            };
            self.log(err.to_string());
            report.skipped = Some(SkipReason::DestinationUnavailable);
            return report;
        }

        for component in components {
            let src = save_path.join(component);
            let dst = destination_dir.join(component);

            if !entry_exists(&src).await {
                self.log(format!(
                    "Source missing for '{}': {} (skipping this component)",
                    name,
                    src.display()
                ));
                report.missing.push(src);
                continue;
            }

            if is_within(save_path, &dst) {
                self.log(format!(
                    "Refusing to replace {}: it contains the source directory",
                    dst.display()
                ));
                report.failed.push(src);
                continue;
            }

            if entry_exists(&dst).await {
                match remove_entry(&dst).await {
                    Ok(()) => {
                        self.log(format!("Overwriting existing destination {}", dst.display()));
                        report.overwritten.push(dst.clone());
                    }
                    Err(e) => {
                        let err = RelocateError::RemoveExistingFailed {
                            path: dst.clone(),
                            source: e,
                        };
                        self.log(err.to_string());
                    }
                }
            }

            let outcome = relocate_entry(&src, &dst).await;
            self.record_outcome(&mut report, src, dst, outcome);
        }

        report
    }

    /// Journal one relocation result and file it in the report.
    ///
    /// A copy whose source could not be deleted still counts as moved: the
    /// destination is complete, while the source may be partly deleted.
    fn record_outcome(
        &self,
        report: &mut MoveReport,
        src: PathBuf,
        dst: PathBuf,
        outcome: Result<(), RelocateError>,
    ) {
        match outcome {
            Ok(()) => {
                self.log(format!("Moved {} -> {}", src.display(), dst.display()));
                report.moved.push(dst);
            }
            Err(err @ RelocateError::SourceCleanupFailed { .. }) => {
                self.log(format!(
                    "Warning: {}. {} is complete; the leftover source may be incomplete and must be deleted by hand",
                    err,
                    dst.display()
                ));
                report.moved.push(dst);
                report.leftover.push(src);
            }
            Err(err) => {
                self.log(err.to_string());
                report.failed.push(src);
            }
        }
    }

    /// Remove now-empty directories from `save_path` upward.
    ///
    /// Stops at the first non-empty directory, the first error, or the
    /// download root, which is never removed.
    pub async fn cleanup_empty_parents(
        &self,
        save_path: &Path,
        download_root: &Path,
    ) -> Vec<PathBuf> {
        let root = normalize_path(download_root);
        let mut current = normalize_path(save_path);
        let mut removed = Vec::new();

        while current != root && current.starts_with(&root) {
            match is_empty_dir(&current).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) if e.kind() == io::ErrorKind::NotFound => break,
                Err(e) => {
                    self.log(format!(
                        "Error during cleanup under {}: {}",
                        current.display(),
                        e
                    ));
                    break;
                }
            }

            if let Err(e) = fs::remove_dir(&current).await {
                self.log(format!(
                    "Error during cleanup under {}: {}",
                    current.display(),
                    e
                ));
                break;
            }
            self.log(format!("Removed empty directory {}", current.display()));
            removed.push(current.clone());

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        removed
    }
}

/// Existence check that does not follow symlinks.
async fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}

async fn is_empty_dir(path: &Path) -> io::Result<bool> {
    let mut entries = fs::read_dir(path).await?;
    Ok(entries.next_entry().await?.is_none())
}

/// Remove a directory tree, or a single file or symlink.
async fn remove_entry(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path).await?;
    if meta.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    }
}

fn is_cross_device(e: &io::Error) -> bool {
    // EXDEV is 18 on Linux and macOS
    e.kind() == io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18)
}

/// Rename, falling back to copy-then-delete across filesystems.
async fn relocate_entry(src: &Path, dst: &Path) -> Result<(), RelocateError> {
    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!("{} is on another device, copying", dst.display());
            copy_then_delete(src, dst).await
        }
        Err(e) => Err(RelocateError::move_failed(
            src.to_path_buf(),
            dst.to_path_buf(),
            e,
        )),
    }
}

async fn copy_then_delete(src: &Path, dst: &Path) -> Result<(), RelocateError> {
    let (from, to) = (src.to_path_buf(), dst.to_path_buf());
    let copied = match tokio::task::spawn_blocking(move || copy_tree(&from, &to)).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    if let Err(reason) = copied {
        if entry_exists(dst).await {
            if let Err(e) = remove_entry(dst).await {
                debug!("Could not remove partial copy {}: {}", dst.display(), e);
            }
        }
        return Err(RelocateError::copy_failed(
            src.to_path_buf(),
            dst.to_path_buf(),
            reason,
        ));
    }

    remove_entry(src)
        .await
        .map_err(|e| RelocateError::SourceCleanupFailed {
            source_path: src.to_path_buf(),
            error: e,
        })
}

fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    let meta = std::fs::symlink_metadata(source)?;
    if !meta.is_dir() {
        return copy_entry(source, destination, &meta.file_type());
    }

    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            copy_entry(entry.path(), &target, &entry.file_type())?;
        }
    }
    Ok(())
}

fn copy_entry(source: &Path, destination: &Path, file_type: &std::fs::FileType) -> io::Result<()> {
    if file_type.is_symlink() {
        return copy_symlink(source, destination);
    }
    std::fs::copy(source, destination).map(|_| ())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> io::Result<()> {
    let target = std::fs::read_link(source)?;
    std::os::unix::fs::symlink(target, destination)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, destination: &Path) -> io::Result<()> {
    std::fs::copy(source, destination).map(|_| ())
}
