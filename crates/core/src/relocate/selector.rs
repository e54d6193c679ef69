//! Selection of the top-level entries that belong to a torrent.

use std::collections::BTreeSet;

use crate::torrent_client::FileEntry;

/// Distinct first path segments of a torrent's files.
///
/// Backslashes are treated as separators. Entries with an empty first segment
/// (empty or absolute paths) and entries starting with `.` or `..` are skipped,
/// since they do not name a child of the save path.
pub fn select_top_components(files: &[FileEntry]) -> BTreeSet<String> {
    files
        .iter()
        .filter_map(|file| top_component(&file.path))
        .collect()
}

fn top_component(path: &str) -> Option<String> {
    let normalized = path.replace('\\', "/");
    let top = normalized.split('/').next().unwrap_or_default();
    match top {
        "" | "." | ".." => None,
        top => Some(top.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(paths: &[&str]) -> Vec<FileEntry> {
        paths.iter().map(|p| FileEntry::new(*p, 1)).collect()
    }

    #[test]
    fn test_distinct_first_segments() {
        let files = entries(&["showA/ep1.mkv", "showA/ep2.mkv", "nfo.txt"]);
        let tops: Vec<String> = select_top_components(&files).into_iter().collect();
        assert_eq!(tops, vec!["nfo.txt", "showA"]);
    }

    #[test]
    fn test_windows_separators_are_normalized() {
        let files = entries(&["Movie (2020)\\movie.mkv", "Movie (2020)/subs/en.srt"]);
        let tops: Vec<String> = select_top_components(&files).into_iter().collect();
        assert_eq!(tops, vec!["Movie (2020)"]);
    }

    #[test]
    fn test_unusable_entries_are_skipped() {
        let files = entries(&["", "/abs/file", "./x", "../escape", "ok.mkv"]);
        let tops: Vec<String> = select_top_components(&files).into_iter().collect();
        assert_eq!(tops, vec!["ok.mkv"]);
    }

    #[test]
    fn test_no_entries_gives_empty_set() {
        assert!(select_top_components(&[]).is_empty());
        assert!(select_top_components(&entries(&["", "/"])).is_empty());
    }

    #[test]
    fn test_output_is_sorted() {
        let files = entries(&["zeta/a", "Alpha/b", "mid.txt"]);
        let tops: Vec<String> = select_top_components(&files).into_iter().collect();
        assert_eq!(tops, vec!["Alpha", "mid.txt", "zeta"]);
    }
}
