// SPDX-License-Identifier: MIT

//! Outbound peer-transport client: issues JSON-RPC-shaped calls to another
//! agent's `/mcp` endpoint, or to an external tool endpoint configured the
//! same way (spec §4.4).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;

use oa_wire::{PeerError, PeerRequest, PeerResponse};

use crate::env;

#[derive(Debug, Error)]
pub enum PeerCallError {
    #[error("connecting to peer timed out")]
    ConnectTimeout,
    #[error("peer request timed out")]
    RequestTimeout,
    #[error("transport error calling peer: {0}")]
    Transport(String),
    #[error("peer returned malformed response: {0}")]
    Protocol(String),
    #[error("peer returned an error: {0}")]
    Remote(#[from] PeerError),
}

/// Thin wrapper over a pooled `reqwest::Client` that speaks the peer JSON-RPC
/// protocol (spec §4.4, §6).
#[derive(Clone)]
pub struct PeerClient {
    http: reqwest::Client,
    next_id: std::sync::Arc<AtomicU64>,
}

impl PeerClient {
    pub fn new() -> Self {
        Self::with_timeouts(env::peer_connect_timeout(), env::peer_request_timeout())
    }

    pub fn with_timeouts(connect_timeout: Duration, request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self { http, next_id: std::sync::Arc::new(AtomicU64::new(1)) }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn call(&self, endpoint: &str, request: PeerRequest) -> Result<serde_json::Value, PeerCallError> {
        let resp = self.http.post(endpoint).json(&request).send().await.map_err(|e| {
            if e.is_timeout() {
                if e.is_connect() {
                    PeerCallError::ConnectTimeout
                } else {
                    PeerCallError::RequestTimeout
                }
            } else {
                PeerCallError::Transport(e.to_string())
            }
        })?;

        if !resp.status().is_success() {
            return Err(PeerCallError::Transport(format!("http status {}", resp.status())));
        }

        let parsed: PeerResponse =
            resp.json().await.map_err(|e| PeerCallError::Protocol(e.to_string()))?;
        Ok(parsed.into_result()?)
    }

    /// Deliver a message from `from_peer` into the target agent's reasoning
    /// loop, addressed by `correlation_id`. Returns the remote's reply text.
    pub async fn receive_message(
        &self,
        endpoint: &str,
        from_peer: &str,
        message: &str,
        correlation_id: &str,
    ) -> Result<String, PeerCallError> {
        let request = PeerRequest::receive_message(self.next_id(), from_peer, message, correlation_id);
        let value = self.call(endpoint, request).await?;
        value
            .get("reply")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| PeerCallError::Protocol("missing \"reply\" field".into()))
    }

    /// Invoke an external tool endpoint configured in the descriptor. The
    /// endpoint is addressed with the same JSON-RPC envelope as a peer call,
    /// using the tool's raw parameters as `receive_message`'s `message`
    /// would not fit; instead the parameters are forwarded verbatim under
    /// `method: "invoke"`.
    pub async fn invoke_tool(
        &self,
        endpoint: &str,
        tool: &str,
        parameters: serde_json::Value,
    ) -> Result<serde_json::Value, PeerCallError> {
        let request =
            PeerRequest { method: "invoke".into(), params: serde_json::json!({ "tool": tool, "parameters": parameters }), id: self.next_id() };
        self.call(endpoint, request).await
    }
}

impl Default for PeerClient {
    fn default() -> Self {
        Self::new()
    }
}
