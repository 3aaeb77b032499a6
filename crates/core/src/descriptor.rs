// SPDX-License-Identifier: MIT

//! Agent descriptor: the immutable identity and configuration of an agent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::name::AgentName;

/// An external tool endpoint the agent may dispatch tool calls to, in
/// addition to its peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolEndpoint {
    /// Name the model invokes this tool by.
    pub name: String,
    /// URL the peer-transport-style JSON-RPC call is issued against.
    pub endpoint: String,
    /// Short description rendered into the model's capability catalogue.
    #[serde(default)]
    pub description: String,
}

/// Immutable identity and configuration of one agent, created by the
/// operator before the supervisor ever spawns a process for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique, filesystem-safe name.
    pub name: AgentName,
    /// Peer-transport port, unique per host.
    pub port: u16,
    /// Model provider identifier (e.g. "anthropic", "mock").
    pub provider: String,
    /// Model identifier within that provider.
    pub model: String,
    /// Seed instruction / system-prompt role text.
    pub role: String,
    /// Optional external tool endpoints, dispatched like peer calls.
    #[serde(default)]
    pub tools: Vec<ToolEndpoint>,
    /// JSON array of scripted mock-provider steps (see
    /// `oa_provider::parse_mock_script`), used only when `provider` isn't an
    /// `http://`/`https://` endpoint. Lets a descriptor drive a specific
    /// multi-step conversation — including tool calls and failures — in
    /// tests and demos without a real model behind it.
    #[serde(default)]
    pub mock_script: Option<String>,
}

impl AgentDescriptor {
    pub fn new(
        name: AgentName,
        port: u16,
        provider: impl Into<String>,
        model: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            name,
            port,
            provider: provider.into(),
            model: model.into(),
            role: role.into(),
            tools: Vec::new(),
            mock_script: None,
        }
    }

    /// Attach a scripted mock-provider conversation (spec §8 scenario 1/5
    /// style tests that need a specific multi-step exchange).
    pub fn with_mock_script(mut self, script: impl Into<String>) -> Self {
        self.mock_script = Some(script.into());
        self
    }
}

/// A descriptor file as loaded from TOML: either one `[agent]` table or a
/// list of `[[agent]]` tables. Unrecognized top-level keys are rejected by
/// `serde(deny_unknown_fields)` on the loader's concrete struct (see
/// `oa-supervisor::config`), not here — this type only describes the shape
/// that survives validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorFile {
    #[serde(default, rename = "agent")]
    pub agents: Vec<AgentDescriptor>,
}

/// Optional supervisor tunables that may ride along in a descriptor file's
/// `[supervisor]` table. All fields are optional; absent fields keep the
/// `SupervisorConfig` defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupervisorOverrides {
    pub ready_deadline_ms: Option<u64>,
    pub check_interval_ms: Option<u64>,
    pub check_timeout_ms: Option<u64>,
    pub failure_threshold: Option<u32>,
    pub max_restarts: Option<u32>,
    pub restart_window_secs: Option<u64>,
    pub graceful_timeout_ms: Option<u64>,
    pub terminate_timeout_ms: Option<u64>,
}

/// Map of peer name to peer endpoint URL, as accepted by `connect`.
pub type PeerMap = HashMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_roundtrips_serde() {
        let d = AgentDescriptor::new(
            AgentName::new("alice").unwrap(),
            9001,
            "mock",
            "mock-1",
            "helpful assistant",
        );
        let json = serde_json::to_string(&d).unwrap();
        let back: AgentDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }
}
