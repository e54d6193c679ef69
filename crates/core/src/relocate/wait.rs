//! Bounded wait for a destination directory to become usable.

use std::path::Path;
use std::time::Duration;

use tokio::fs;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Wait until `path` is a directory that can be listed, or give up after `timeout`.
///
/// Network and USB mounts can take a while to spin up; a mount point that
/// exists but errors on listing counts as not ready. The path is probed at
/// least once even with a zero timeout.
pub async fn wait_for_directory(path: &Path, timeout: Duration, interval: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if is_listable_dir(path).await {
            return true;
        }
        if Instant::now() + interval > deadline {
            debug!("Gave up waiting for {}", path.display());
            return false;
        }
        sleep(interval).await;
    }
}

async fn is_listable_dir(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => match fs::read_dir(path).await {
            Ok(mut entries) => entries.next_entry().await.is_ok(),
            Err(_) => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_existing_directory_is_ready() {
        let temp = TempDir::new().unwrap();
        assert!(
            wait_for_directory(
                temp.path(),
                Duration::from_millis(50),
                Duration::from_millis(10)
            )
            .await
        );
    }

    #[tokio::test]
    async fn test_missing_directory_times_out() {
        let temp = TempDir::new().unwrap();
        let start = std::time::Instant::now();
        let ready = wait_for_directory(
            &temp.path().join("not-mounted"),
            Duration::from_millis(60),
            Duration::from_millis(20),
        )
        .await;
        assert!(!ready);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_file_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain");
        std::fs::write(&file, "x").unwrap();
        assert!(!wait_for_directory(&file, Duration::ZERO, Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn test_directory_appearing_during_wait() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("late");
        let create = target.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            fs::create_dir(&create).await.unwrap();
        });

        assert!(
            wait_for_directory(&target, Duration::from_secs(5), Duration::from_millis(10)).await
        );
    }
}
