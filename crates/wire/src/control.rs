// SPDX-License-Identifier: MIT

//! The control protocol: newline-delimited JSON request/reply (spec §4.2).
//!
//! Every reply on the wire is one or more [`crate::framing::ResponseFrame`]
//! lines: zero or more `event` frames (used by `chat` and `subscribe_events`
//! to stream progress) followed, for every command except
//! `subscribe_events`, by exactly one `final` frame carrying a [`Response`].
//! This keeps the framing uniform across streaming and non-streaming
//! commands instead of special-casing `chat`/`subscribe_events` at the
//! transport layer.

use oa_core::MetricsSnapshot;
use serde::{Deserialize, Serialize};

/// Request from an operator or the supervisor to an agent's control socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    /// Health check, used by the supervisor's readiness handshake and
    /// recovery loop.
    Health,

    /// Add (or overwrite) a peer in the routing table.
    Connect { peer: String, endpoint: String },

    /// Remove a peer from the routing table. No error if absent.
    Disconnect { peer: String },

    /// Snapshot of the current routing table.
    ListConnections,

    /// Metrics snapshot, optionally formatted for Prometheus scraping.
    Metrics {
        #[serde(default)]
        format: MetricsFormat,
    },

    /// Subscribe to the agent's event stream, optionally replaying from a
    /// given sequence number.
    SubscribeEvents {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        since_seq: Option<u64>,
    },

    /// Inject a user turn and wait for the reasoning loop to quiesce.
    Chat {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correlation_id: Option<String>,
    },

    /// Request graceful shutdown.
    Shutdown,
}

/// `metrics` response format (spec §4.2, §6).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricsFormat {
    #[default]
    Json,
    Prometheus,
}

/// Health status reported by `health` (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ready,
    Starting,
}

/// Final payload of a `chat` exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResult {
    pub response: String,
}

/// The final frame's payload for every command. Named variants correspond
/// 1:1 with the status strings implied by spec §4.2's table; `Error` covers
/// the `{"error": "..."}` shape used for malformed/unknown commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Health { status: HealthStatus, peer_port: u16, peers: Vec<String>, uptime_s: u64 },
    Connected,
    Disconnected,
    Connections { peers: std::collections::HashMap<String, String> },
    MetricsJson { metrics: MetricsSnapshot },
    MetricsPrometheus { body: String },
    ChatComplete { response: String },
    ShuttingDown,
    Error { message: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error { message: message.into() }
    }

    pub fn unknown_command() -> Self {
        Response::error("unknown_command")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_connect() {
        let req = Request::Connect { peer: "bob".into(), endpoint: "http://bob:9002/mcp".into() };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"cmd\":\"connect\""));
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn response_round_trips_health() {
        let resp = Response::Health {
            status: HealthStatus::Ready,
            peer_port: 9001,
            peers: vec!["bob".into()],
            uptime_s: 42,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "health");
        let back: Response = serde_json::from_value(json).unwrap();
        assert_eq!(back, resp);
    }

    #[test]
    fn metrics_format_defaults_to_json() {
        let req: Request = serde_json::from_str("{\"cmd\":\"metrics\"}").unwrap();
        assert_eq!(req, Request::Metrics { format: MetricsFormat::Json });
    }
}
