// SPDX-License-Identifier: MIT

//! Supervisor-owned, mutable process record for one agent.

use serde::{Deserialize, Serialize};

use crate::descriptor::AgentDescriptor;

/// Lifecycle status of a supervised agent process.
///
/// Transitions are monotone except `Running <-> Unhealthy` and
/// `Starting -> Failed` (spec §3 invariants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Starting,
    Running,
    Unhealthy,
    Failed,
    Stopping,
    Stopped,
}

impl AgentStatus {
    /// Whether a transition from `self` to `next` is legal under the
    /// monotonicity invariant.
    pub fn can_transition_to(self, next: AgentStatus) -> bool {
        use AgentStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Starting, Running) | (Starting, Failed) => true,
            (Running, Unhealthy) | (Unhealthy, Running) => true,
            (Running, Stopping) | (Unhealthy, Stopping) | (Starting, Stopping) => true,
            (Unhealthy, Failed) => true,
            (Stopping, Stopped) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentStatus::Starting => "starting",
            AgentStatus::Running => "running",
            AgentStatus::Unhealthy => "unhealthy",
            AgentStatus::Failed => "failed",
            AgentStatus::Stopping => "stopping",
            AgentStatus::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

/// Supervisor-owned, mutable record tracking one agent's process lifecycle.
///
/// Serializable so it can be written into the registry file (spec §6) for
/// discovery by a fresh CLI invocation after the spawning process exits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProcessRecord {
    pub descriptor: AgentDescriptor,
    pub status: AgentStatus,
    /// OS pid of the current process incarnation, if any is running.
    pub pid: Option<u32>,
    /// Unix epoch milliseconds of the most recent start.
    pub started_at_ms: Option<u64>,
    /// Consecutive health-probe failures since the last success.
    #[serde(default)]
    pub consecutive_failures: u32,
    /// Restarts performed within the current rolling window.
    #[serde(default)]
    pub restarts_in_window: u32,
    /// Unix epoch milliseconds marking the start of the current restart window.
    pub window_started_at_ms: Option<u64>,
    /// Path to this agent's control socket.
    pub control_socket: String,
    /// Last-known peer endpoint (host:port or full URL), if ever started.
    pub peer_endpoint: Option<String>,
}

impl AgentProcessRecord {
    pub fn new(descriptor: AgentDescriptor, control_socket: String) -> Self {
        Self {
            descriptor,
            status: AgentStatus::Starting,
            pid: None,
            started_at_ms: None,
            consecutive_failures: 0,
            restarts_in_window: 0,
            window_started_at_ms: None,
            control_socket,
            peer_endpoint: None,
        }
    }
}
