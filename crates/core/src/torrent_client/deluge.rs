//! Deluge torrent client implementation (deluge-web JSON-RPC).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::DelugeConfig;

use super::normalize::{normalize_status, parse_status_map, text, STATUS_KEYS};
use super::{TorrentClient, TorrentClientError, TorrentStatus};

/// Error code deluge-web uses for an unauthenticated session.
const NOT_AUTHENTICATED: i64 = 1;

/// Deluge client talking to the deluge-web JSON-RPC endpoint.
pub struct DelugeClient {
    client: Client,
    config: DelugeConfig,
    /// Whether we hold an authenticated session cookie connected to a daemon.
    session: Arc<RwLock<bool>>,
    request_id: AtomicU64,
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: i64,
}

impl DelugeClient {
    /// Create a new Deluge client.
    pub fn new(config: DelugeConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| TorrentClientError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config,
            session: Arc::new(RwLock::new(false)),
            request_id: AtomicU64::new(1),
        })
    }

    /// JSON-RPC endpoint URL.
    fn endpoint(&self) -> String {
        format!("{}/json", self.config.url.trim_end_matches('/'))
    }

    /// Send one JSON-RPC request without session handling.
    async fn send(&self, method: &str, params: Value) -> Result<RpcResponse, TorrentClientError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "method": method, "params": params, "id": id });

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorrentClientError::Timeout
                } else if e.is_connect() {
                    TorrentClientError::ConnectionFailed(e.to_string())
                } else {
                    TorrentClientError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        response
            .json::<RpcResponse>()
            .await
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))
    }

    /// Login and store the session cookie.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let response = self
            .send("auth.login", json!([self.config.password]))
            .await?;

        if let Some(err) = response.error {
            return Err(TorrentClientError::AuthenticationFailed(err.message));
        }
        if response.result != Value::Bool(true) {
            return Err(TorrentClientError::AuthenticationFailed(
                "Invalid password".to_string(),
            ));
        }
        debug!("deluge-web login successful");
        Ok(())
    }

    /// Make sure deluge-web is connected to a daemon.
    async fn connect_daemon(&self) -> Result<(), TorrentClientError> {
        let connected = into_result("web.connected", self.send("web.connected", json!([])).await?)?;
        if connected == Value::Bool(true) {
            return Ok(());
        }

        let hosts = into_result("web.get_hosts", self.send("web.get_hosts", json!([])).await?)?;
        let host_id = pick_host(&hosts, self.config.host_id.as_deref()).ok_or_else(|| {
            TorrentClientError::NoHost(
                self.config
                    .host_id
                    .clone()
                    .unwrap_or_else(|| "no hosts configured in deluge-web".to_string()),
            )
        })?;

        info!("Connecting deluge-web to daemon host {}", host_id);
        into_result("web.connect", self.send("web.connect", json!([host_id])).await?)?;
        Ok(())
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_session(&self) -> Result<(), TorrentClientError> {
        let session = self.session.read().await;
        if *session {
            return Ok(());
        }
        drop(session);

        self.login().await?;
        self.connect_daemon().await?;
        *self.session.write().await = true;
        Ok(())
    }

    /// Make an authenticated RPC call, re-authenticating once on an expired session.
    async fn call(&self, method: &str, params: Value) -> Result<Value, TorrentClientError> {
        self.ensure_session().await?;

        let response = self.send(method, params.clone()).await?;
        if matches!(&response.error, Some(err) if err.code == NOT_AUTHENTICATED) {
            warn!("deluge-web session expired, re-authenticating");
            *self.session.write().await = false;
            self.ensure_session().await?;
            return into_result(method, self.send(method, params).await?);
        }

        into_result(method, response)
    }
}

/// Turn an RPC envelope into its result or a typed error.
fn into_result(method: &str, response: RpcResponse) -> Result<Value, TorrentClientError> {
    match response.error {
        Some(err) if err.code == NOT_AUTHENTICATED => {
            Err(TorrentClientError::AuthenticationFailed(err.message))
        }
        Some(err) => Err(TorrentClientError::Rpc {
            method: method.to_string(),
            message: err.message,
        }),
        None => Ok(response.result),
    }
}

/// Pick a daemon host id from a `web.get_hosts` answer.
///
/// Each host is an array whose first element is the id. A preferred id is only
/// returned when present in the list.
fn pick_host(hosts: &Value, preferred: Option<&str>) -> Option<String> {
    let ids: Vec<String> = hosts
        .as_array()?
        .iter()
        .filter_map(|host| host.as_array().and_then(|h| h.first()))
        .map(|id| text(Some(id)))
        .filter(|id| !id.is_empty())
        .collect();

    match preferred {
        Some(wanted) => ids.into_iter().find(|id| id == wanted),
        None => ids.into_iter().next(),
    }
}

/// Interpret `max_active_downloading`. Deluge uses -1 for "unlimited".
fn parse_max_active(value: &Value) -> Option<u32> {
    let n = value.as_i64()?;
    if n < 0 {
        Some(u32::MAX)
    } else {
        Some(u32::try_from(n).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl TorrentClient for DelugeClient {
    fn name(&self) -> &str {
        "deluge"
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentStatus>, TorrentClientError> {
        let result = self
            .call("core.get_torrents_status", json!([{}, STATUS_KEYS]))
            .await?;
        parse_status_map(result)
    }

    async fn get_torrent(&self, id: &str) -> Result<TorrentStatus, TorrentClientError> {
        let result = self
            .call("core.get_torrent_status", json!([id, STATUS_KEYS]))
            .await?;

        match result {
            Value::Object(fields) if !fields.is_empty() => Ok(normalize_status(id, &fields)),
            _ => Err(TorrentClientError::TorrentNotFound(id.to_string())),
        }
    }

    async fn resume_torrents(&self, ids: &[String]) -> Result<(), TorrentClientError> {
        self.call("core.resume_torrents", json!([ids])).await?;
        Ok(())
    }

    async fn pause_torrents(&self, ids: &[String]) -> Result<(), TorrentClientError> {
        self.call("core.pause_torrents", json!([ids])).await?;
        Ok(())
    }

    async fn force_recheck(&self, ids: &[String]) -> Result<(), TorrentClientError> {
        self.call("core.force_recheck", json!([ids])).await?;
        Ok(())
    }

    async fn remove_torrent(&self, id: &str, remove_data: bool) -> Result<(), TorrentClientError> {
        let result = self
            .call("core.remove_torrent", json!([id, remove_data]))
            .await?;
        if result == Value::Bool(false) {
            return Err(TorrentClientError::TorrentNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn session_torrent_ids(&self) -> Result<Vec<String>, TorrentClientError> {
        let result = self.call("core.get_session_state", json!([])).await?;
        match result {
            Value::Array(ids) => Ok(ids.iter().map(|id| text(Some(id))).collect()),
            other => Err(TorrentClientError::ApiError(format!(
                "unexpected session state: {}",
                other
            ))),
        }
    }

    async fn max_active_downloading(&self) -> Result<Option<u32>, TorrentClientError> {
        let result = self
            .call("core.get_config_value", json!(["max_active_downloading"]))
            .await?;
        Ok(parse_max_active(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> DelugeClient {
        DelugeClient::new(DelugeConfig {
            url: url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(client("http://host:8112/").endpoint(), "http://host:8112/json");
        assert_eq!(client("http://host:8112").endpoint(), "http://host:8112/json");
    }

    #[test]
    fn test_rpc_response_parsing() {
        let ok: RpcResponse =
            serde_json::from_str(r#"{"id": 1, "result": true, "error": null}"#).unwrap();
        assert_eq!(ok.result, Value::Bool(true));
        assert!(ok.error.is_none());

        let err: RpcResponse = serde_json::from_str(
            r#"{"id": 2, "result": null, "error": {"message": "Not authenticated", "code": 1}}"#,
        )
        .unwrap();
        let err = into_result("core.get_session_state", err).unwrap_err();
        assert!(matches!(err, TorrentClientError::AuthenticationFailed(_)));
    }

    #[test]
    fn test_rpc_error_carries_method() {
        let response: RpcResponse = serde_json::from_str(
            r#"{"id": 3, "result": null, "error": {"message": "Unknown method", "code": 2}}"#,
        )
        .unwrap();
        match into_result("core.nope", response) {
            Err(TorrentClientError::Rpc { method, message }) => {
                assert_eq!(method, "core.nope");
                assert_eq!(message, "Unknown method");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_pick_host() {
        let hosts = json!([
            ["a1", "127.0.0.1", 58846, "localclient"],
            ["b2", "10.0.0.2", 58846, "remote"]
        ]);
        assert_eq!(pick_host(&hosts, None), Some("a1".to_string()));
        assert_eq!(pick_host(&hosts, Some("b2")), Some("b2".to_string()));
        assert_eq!(pick_host(&hosts, Some("zz")), None);
        assert_eq!(pick_host(&json!([]), None), None);
        assert_eq!(pick_host(&json!("nope"), None), None);
    }

    #[test]
    fn test_parse_max_active() {
        assert_eq!(parse_max_active(&json!(5)), Some(5));
        assert_eq!(parse_max_active(&json!(-1)), Some(u32::MAX));
        assert_eq!(parse_max_active(&Value::Null), None);
        assert_eq!(parse_max_active(&json!("5")), None);
    }
}
