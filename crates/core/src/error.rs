// SPDX-License-Identifier: MIT

//! Error taxonomy (spec §7): kinds, not types. Every crate's concrete error
//! enum implements `AsErrorKind` so the CLI can pick an exit code (spec §6)
//! without string matching.

use serde::{Deserialize, Serialize};

/// Coarse classification of a failure, matching the table in spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown agent, name collision, invalid descriptor: caller must fix.
    Operator,
    /// Port busy, credentials missing, ready-deadline exceeded.
    Startup,
    /// Consecutive unresponsive health probes.
    Health,
    /// Peer call or control call transport failure.
    Transport,
    /// Model provider error or rate limit.
    Model,
    /// Tool-call text didn't parse as a structured invocation.
    ToolCallParse,
    /// Escalation through terminate/kill did not stop the process in time.
    ShutdownTimeout,
}

impl ErrorKind {
    /// Exit code per spec §6: 0 success, 1 operator error, 2 agent failure,
    /// 3 transport error. Health/model/tool-call-parse kinds never reach the
    /// CLI directly (they're recovered locally per spec §7), so they don't
    /// need a distinct code; map them to 2 defensively.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Operator => 1,
            ErrorKind::Startup | ErrorKind::Health | ErrorKind::ShutdownTimeout => 2,
            ErrorKind::Transport => 3,
            ErrorKind::Model | ErrorKind::ToolCallParse => 2,
        }
    }
}

/// A minimal, serializable error envelope used where a typed error needs to
/// cross the control-socket wire (e.g. inside a tool-call result or an
/// event payload) without pulling in every crate's concrete error type.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct OrchestrationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl OrchestrationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}
