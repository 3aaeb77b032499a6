// SPDX-License-Identifier: MIT

//! Event taxonomy backing `subscribe_events` (spec §4.5).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::CorrelationId;

/// Monotonically increasing, per-agent sequence number.
pub type SequenceNumber = u64;

/// The kind of an event, with its kind-specific payload. Serializes as
/// `{"kind": "turn_started", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    TurnStarted,
    TurnFinished { response: String },
    TurnCapped { iterations: u32 },
    ToolCallStarted { tool: String },
    ToolCallFinished { tool: String, ok: bool },
    PeerMessageReceived { from: String },
    PeerMessageSent { to: String },
    ModelRequest,
    ModelResponse { had_tool_calls: bool },
    Error { message: String },
    Connected { peer: String },
    Disconnected { peer: String },
    ShutdownRequested,
    HealthFailure { consecutive_failures: u32 },
    Restarted { attempt: u32 },
}

/// One append-only event-bus record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: SequenceNumber,
    pub wall_time_ms: u64,
    pub correlation_id: Option<CorrelationId>,
    pub peer_name: Option<String>,
    #[serde(flatten)]
    pub kind: EventKind,
    /// Free-form extra payload for kinds that don't warrant a dedicated
    /// field (mirrors the `_meta` convention allowed on the wire, spec §6).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl EventRecord {
    pub fn new(seq: SequenceNumber, wall_time_ms: u64, kind: EventKind) -> Self {
        Self { seq, wall_time_ms, correlation_id: None, peer_name: None, kind, payload: None }
    }

    pub fn with_correlation(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer_name = Some(peer.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_record_serializes_with_tagged_kind() {
        let rec = EventRecord::new(1, 1_000, EventKind::TurnStarted);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["kind"], "turn_started");
        assert_eq!(json["seq"], 1);
    }

    #[test]
    fn tool_call_started_carries_tool_name() {
        let rec = EventRecord::new(
            2,
            2_000,
            EventKind::ToolCallStarted { tool: "communicate_with_bob".into() },
        );
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["tool"], "communicate_with_bob");
    }
}
