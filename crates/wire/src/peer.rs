// SPDX-License-Identifier: MIT

//! Peer transport wire types: JSON-RPC-shaped requests over HTTP POST to
//! `/mcp` (spec §4.4, §6).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC-shaped request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerRequest {
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl PeerRequest {
    pub fn receive_message(id: u64, from: &str, message: &str, correlation_id: &str) -> Self {
        Self {
            method: "receive_message".into(),
            params: serde_json::json!({
                "from": from,
                "message": message,
                "correlation_id": correlation_id,
            }),
            id,
        }
    }

    pub fn chat_with_user(id: u64, message: &str, correlation_id: &str) -> Self {
        Self {
            method: "chat_with_user".into(),
            params: serde_json::json!({ "message": message, "correlation_id": correlation_id }),
            id,
        }
    }

    pub fn status(id: u64) -> Self {
        Self { method: "status".into(), params: Value::Null, id }
    }
}

/// JSON-RPC-shaped error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerError {
    pub code: i32,
    pub message: String,
}

impl PeerError {
    pub const UNKNOWN_METHOD: i32 = -32601;
    pub const INTERNAL: i32 = -32000;

    pub fn unknown_method(method: &str) -> Self {
        Self { code: Self::UNKNOWN_METHOD, message: format!("unknown method: {method}") }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { code: Self::INTERNAL, message: message.into() }
    }
}

/// A JSON-RPC-shaped response body: either `result` or `error`, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PeerError>,
    pub id: u64,
}

impl PeerResponse {
    pub fn ok(id: u64, result: Value) -> Self {
        Self { result: Some(result), error: None, id }
    }

    pub fn err(id: u64, error: PeerError) -> Self {
        Self { result: None, error: Some(error), id }
    }

    pub fn into_result(self) -> Result<Value, PeerError> {
        match (self.result, self.error) {
            (Some(v), _) => Ok(v),
            (None, Some(e)) => Err(e),
            (None, None) => Err(PeerError::internal("empty response")),
        }
    }
}

/// Result of a `status()` peer call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResult {
    pub name: String,
    pub peers: Vec<String>,
    pub uptime_s: u64,
}
