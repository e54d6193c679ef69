//! Checks that a save path is usable before trying to recover a torrent.

use std::path::Path;

use crate::relocate::normalize_path;

/// Whether `path` sits on a mounted filesystem other than the root.
///
/// Walks up from `path` and stops at the first mount point. Reaching `/`
/// without finding one means the path lives on the root filesystem, which
/// for a data drive usually means the drive is not mounted.
#[cfg(unix)]
pub fn is_mounted_path(path: &Path) -> bool {
    let path = normalize_path(path);
    path.ancestors()
        .take_while(|dir| dir.parent().is_some())
        .any(is_mount_point)
}

#[cfg(not(unix))]
pub fn is_mounted_path(_path: &Path) -> bool {
    true
}

/// A directory is a mount point when its device differs from its parent's.
#[cfg(unix)]
fn is_mount_point(dir: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    let Ok(meta) = std::fs::symlink_metadata(dir) else {
        return false;
    };
    if !meta.is_dir() {
        return false;
    }
    let Some(parent) = dir.parent() else {
        return true;
    };
    match std::fs::metadata(parent) {
        Ok(parent_meta) => parent_meta.dev() != meta.dev() || parent_meta.ino() == meta.ino(),
        Err(_) => false,
    }
}

/// Whether this process may write to `path`.
///
/// Asks the kernel with the real user and group ids, so ownership and
/// read-only mounts are taken into account.
#[cfg(unix)]
pub fn is_writable(path: &Path) -> bool {
    use nix::unistd::{access, AccessFlags};

    access(path, AccessFlags::W_OK).is_ok()
}

#[cfg(not(unix))]
pub fn is_writable(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => !meta.permissions().readonly(),
        Err(_) => false,
    }
}

/// Existing, writable and on a mounted drive.
pub fn is_accessible(path: &Path) -> bool {
    is_writable(path) && is_mounted_path(path)
}
