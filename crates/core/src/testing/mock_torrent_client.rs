//! Mock torrent client for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::torrent_client::{TorrentClient, TorrentClientError, TorrentState, TorrentStatus};

/// A recorded mutating call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Resume(Vec<String>),
    Pause(Vec<String>),
    Recheck(Vec<String>),
    Remove { id: String, remove_data: bool },
}

/// Mock implementation of the TorrentClient trait.
///
/// Provides controllable behavior for testing:
/// - Track resume/pause/recheck/remove calls for assertions
/// - Script the state a torrent reaches after being resumed
/// - Simulate failures
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTorrentClient::new();
/// client.add_mock_torrent(fixtures::errored_torrent("abc", "Show", "/dl", "Bad address")).await;
/// client.set_state_after_resume("abc", TorrentState::Error).await;
///
/// client.resume_torrents(&["abc".to_string()]).await?;
/// assert_eq!(client.get_torrent("abc").await?.state, TorrentState::Error);
/// assert_eq!(client.calls().await.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockTorrentClient {
    /// Current torrents by id.
    torrents: Arc<RwLock<HashMap<String, TorrentStatus>>>,
    /// Recorded mutating calls, in order.
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TorrentClientError>>>,
    /// State to apply when a torrent is resumed.
    after_resume: Arc<RwLock<HashMap<String, TorrentState>>>,
    /// Ids whose removal always fails.
    failing_removals: Arc<RwLock<HashSet<String>>>,
    /// Overrides the session id list when set.
    session_ids: Arc<RwLock<Option<Vec<String>>>>,
    max_active: Arc<RwLock<Option<u32>>>,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    /// Create a new mock torrent client.
    pub fn new() -> Self {
        Self {
            torrents: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            after_resume: Arc::new(RwLock::new(HashMap::new())),
            failing_removals: Arc::new(RwLock::new(HashSet::new())),
            session_ids: Arc::new(RwLock::new(None)),
            max_active: Arc::new(RwLock::new(None)),
        }
    }

    /// Pre-populate a torrent.
    pub async fn add_mock_torrent(&self, status: TorrentStatus) {
        self.torrents
            .write()
            .await
            .insert(status.id.clone(), status);
    }

    /// Get all recorded mutating calls.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Ids passed to `remove_torrent`, in order.
    pub async fn removed_ids(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Remove { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ids passed to `resume_torrents`, flattened in call order.
    pub async fn resumed_ids(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Resume(ids) => Some(ids.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Set the state for a torrent directly.
    pub async fn set_state(&self, id: &str, state: TorrentState) {
        if let Some(torrent) = self.torrents.write().await.get_mut(id) {
            torrent.state = state;
        }
    }

    /// Script the state `id` reaches when it is next resumed.
    pub async fn set_state_after_resume(&self, id: &str, state: TorrentState) {
        self.after_resume.write().await.insert(id.to_string(), state);
    }

    /// Make every removal of `id` fail.
    pub async fn fail_removal_of(&self, id: &str) {
        self.failing_removals.write().await.insert(id.to_string());
    }

    /// Report these ids from `session_torrent_ids` instead of the known torrents.
    pub async fn set_session_ids(&self, ids: Vec<String>) {
        *self.session_ids.write().await = Some(ids);
    }

    /// Set the value reported by `max_active_downloading`.
    pub async fn set_max_active(&self, max: Option<u32>) {
        *self.max_active.write().await = max;
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    /// Check if a torrent exists.
    pub async fn has_torrent(&self, id: &str) -> bool {
        self.torrents.read().await.contains_key(id)
    }

    /// Get the number of torrents.
    pub async fn torrent_count(&self) -> usize {
        self.torrents.read().await.len()
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<TorrentClientError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, call: RecordedCall) {
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentStatus>, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let mut result: Vec<TorrentStatus> = self.torrents.read().await.values().cloned().collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(result)
    }

    async fn get_torrent(&self, id: &str) -> Result<TorrentStatus, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.torrents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| TorrentClientError::TorrentNotFound(id.to_string()))
    }

    async fn resume_torrents(&self, ids: &[String]) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(RecordedCall::Resume(ids.to_vec())).await;

        let mut scripted = self.after_resume.write().await;
        let mut torrents = self.torrents.write().await;
        for id in ids {
            let Some(torrent) = torrents.get_mut(id) else {
                continue;
            };
            torrent.state = match scripted.remove(id) {
                Some(state) => state,
                None if torrent.is_finished => TorrentState::Seeding,
                None => TorrentState::Downloading,
            };
        }
        Ok(())
    }

    async fn pause_torrents(&self, ids: &[String]) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(RecordedCall::Pause(ids.to_vec())).await;

        let mut torrents = self.torrents.write().await;
        for id in ids {
            if let Some(torrent) = torrents.get_mut(id) {
                torrent.state = TorrentState::Paused;
            }
        }
        Ok(())
    }

    async fn force_recheck(&self, ids: &[String]) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(RecordedCall::Recheck(ids.to_vec())).await;

        let mut torrents = self.torrents.write().await;
        for id in ids {
            if let Some(torrent) = torrents.get_mut(id) {
                torrent.state = TorrentState::Checking;
            }
        }
        Ok(())
    }

    async fn remove_torrent(&self, id: &str, remove_data: bool) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.record(RecordedCall::Remove {
            id: id.to_string(),
            remove_data,
        })
        .await;

        if self.failing_removals.read().await.contains(id) {
            return Err(TorrentClientError::ApiError(format!("cannot remove {}", id)));
        }
        if self.torrents.write().await.remove(id).is_some() {
            Ok(())
        } else {
            Err(TorrentClientError::TorrentNotFound(id.to_string()))
        }
    }

    async fn session_torrent_ids(&self) -> Result<Vec<String>, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        if let Some(ids) = self.session_ids.read().await.clone() {
            return Ok(ids);
        }

        let mut ids: Vec<String> = self.torrents.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn max_active_downloading(&self) -> Result<Option<u32>, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(*self.max_active.read().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_list_is_sorted_by_id() {
        let client = MockTorrentClient::new();
        client
            .add_mock_torrent(fixtures::torrent_in_state("b", "B", "/dl", TorrentState::Paused))
            .await;
        client
            .add_mock_torrent(fixtures::torrent_in_state("a", "A", "/dl", TorrentState::Queued))
            .await;

        let ids: Vec<String> = client
            .list_torrents()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_resume_follows_script() {
        let client = MockTorrentClient::new();
        client
            .add_mock_torrent(fixtures::errored_torrent("x", "X", "/dl", "Bad address"))
            .await;
        client.set_state_after_resume("x", TorrentState::Error).await;

        client.resume_torrents(&["x".to_string()]).await.unwrap();
        assert_eq!(client.get_torrent("x").await.unwrap().state, TorrentState::Error);

        // Script is consumed
        client.resume_torrents(&["x".to_string()]).await.unwrap();
        assert_eq!(
            client.get_torrent("x").await.unwrap().state,
            TorrentState::Downloading
        );
        assert_eq!(client.resumed_ids().await, vec!["x", "x"]);
    }

    #[tokio::test]
    async fn test_error_injection() {
        let client = MockTorrentClient::new();
        client
            .set_next_error(TorrentClientError::ConnectionFailed("test".into()))
            .await;

        assert!(client.list_torrents().await.is_err());

        // Error should be consumed
        assert!(client.list_torrents().await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_records_and_forgets() {
        let client = MockTorrentClient::new();
        client
            .add_mock_torrent(fixtures::finished_torrent("a", "A", "/dl", &["a.mkv"]))
            .await;

        client.remove_torrent("a", false).await.unwrap();
        assert!(!client.has_torrent("a").await);
        assert_eq!(
            client.calls().await,
            vec![RecordedCall::Remove {
                id: "a".to_string(),
                remove_data: false
            }]
        );
        assert!(matches!(
            client.remove_torrent("a", false).await,
            Err(TorrentClientError::TorrentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failing_removal_keeps_torrent() {
        let client = MockTorrentClient::new();
        client
            .add_mock_torrent(fixtures::finished_torrent("a", "A", "/dl", &["a.mkv"]))
            .await;
        client.fail_removal_of("a").await;

        assert!(client.remove_torrent("a", false).await.is_err());
        assert!(client.has_torrent("a").await);
    }

    #[tokio::test]
    async fn test_session_ids_override() {
        let client = MockTorrentClient::new();
        client
            .add_mock_torrent(fixtures::finished_torrent("a", "A", "/dl", &["a.mkv"]))
            .await;
        assert_eq!(client.session_torrent_ids().await.unwrap(), vec!["a"]);

        client.set_session_ids(vec![]).await;
        assert!(client.session_torrent_ids().await.unwrap().is_empty());
    }
}
