//! Destination resolution for a torrent's save path.

use std::path::{Component, Path, PathBuf};

/// A save path expressed relative to its download root.
///
/// An empty relative root means the torrent was saved directly into the
/// shared download root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeRoot(PathBuf);

impl RelativeRoot {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Whether the save path is the download root itself.
    pub fn is_shared_root(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    /// Destination directory under a library root.
    ///
    /// The shared-root case maps onto `final_root` with no extra nesting.
    pub fn destination_under(&self, final_root: &Path) -> PathBuf {
        if self.is_shared_root() {
            final_root.to_path_buf()
        } else {
            final_root.join(&self.0)
        }
    }
}

/// Compute `save_path` relative to `download_root`.
///
/// Returns `None` when the save path does not lie inside the download root.
/// Both paths are normalized first; matching is per component.
pub fn resolve(save_path: &Path, download_root: &Path) -> Option<RelativeRoot> {
    let save = normalize_path(save_path);
    let root = normalize_path(download_root);
    save.strip_prefix(&root)
        .ok()
        .map(|rel| RelativeRoot(rel.to_path_buf()))
}

/// Whether `path` is `root` or lies below it.
pub fn is_within(path: &Path, root: &Path) -> bool {
    resolve(path, root).is_some()
}

/// Make a path absolute and fold `.` and `..` without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_path_equal_to_root_maps_to_final_root() {
        let rel = resolve(Path::new("/dl/tv"), Path::new("/dl/tv")).unwrap();
        assert!(rel.is_shared_root());
        assert_eq!(
            rel.destination_under(Path::new("/lib/tv")),
            PathBuf::from("/lib/tv")
        );
    }

    #[test]
    fn test_nested_save_path_keeps_sub_structure() {
        let rel = resolve(Path::new("/dl/tv/sub/dir"), Path::new("/dl/tv")).unwrap();
        assert!(!rel.is_shared_root());
        assert_eq!(rel.as_path(), Path::new("sub/dir"));
        assert_eq!(
            rel.destination_under(Path::new("/lib/tv")),
            PathBuf::from("/lib/tv/sub/dir")
        );
    }

    #[test]
    fn test_outside_root_is_skipped() {
        assert!(resolve(Path::new("/other/place"), Path::new("/dl/tv")).is_none());
        assert!(resolve(Path::new("/dl"), Path::new("/dl/tv")).is_none());
    }

    #[test]
    fn test_sibling_with_shared_prefix_is_not_inside() {
        assert!(resolve(Path::new("/dl/tv2/show"), Path::new("/dl/tv")).is_none());
        assert!(!is_within(Path::new("/dl/tv_old"), Path::new("/dl/tv")));
    }

    #[test]
    fn test_normalization_before_matching() {
        let rel = resolve(Path::new("/dl/tv/./a/../b/"), Path::new("/dl/tv/")).unwrap();
        assert_eq!(rel.as_path(), Path::new("b"));

        // Escaping through `..` lands outside the root
        assert!(resolve(Path::new("/dl/tv/../movies"), Path::new("/dl/tv")).is_none());
    }

    #[test]
    fn test_relative_paths_resolve_against_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(normalize_path(Path::new("x/./y")), cwd.join("x/y"));
        assert!(is_within(&cwd.join("x"), Path::new(".")));
    }
}
