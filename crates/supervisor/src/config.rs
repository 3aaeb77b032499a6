// SPDX-License-Identifier: MIT

//! Descriptor-file loading (TOML) and supervisor tunables (spec §4.1,
//! SPEC_FULL §10.3).

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use oa_core::descriptor::{AgentDescriptor, SupervisorOverrides};
use oa_core::error::ErrorKind;

/// Supervisor-wide tunables. Every field has the default named in spec
/// §4.1; a descriptor file's `[supervisor]` table may override any subset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupervisorConfig {
    pub ready_deadline: Duration,
    pub check_interval: Duration,
    pub check_timeout: Duration,
    pub failure_threshold: u32,
    pub max_restarts: u32,
    pub restart_window: Duration,
    pub graceful_timeout: Duration,
    pub terminate_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            ready_deadline: Duration::from_secs(30),
            check_interval: Duration::from_secs(5),
            check_timeout: Duration::from_secs(1),
            failure_threshold: 3,
            max_restarts: 5,
            restart_window: Duration::from_secs(3600),
            graceful_timeout: Duration::from_secs(5),
            terminate_timeout: Duration::from_secs(2),
        }
    }
}

impl SupervisorConfig {
    /// Apply a descriptor file's `[supervisor]` overrides on top of the
    /// defaults, then layer `OA_*` environment overrides on top of those
    /// (environment overrides file, SPEC_FULL §10.3). Unset fields keep
    /// whatever the previous layer set.
    pub fn with_overrides(overrides: &SupervisorOverrides) -> Self {
        let defaults = Self::default();
        let file_applied = Self {
            ready_deadline: overrides.ready_deadline_ms.map(Duration::from_millis).unwrap_or(defaults.ready_deadline),
            check_interval: overrides
                .check_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.check_interval),
            check_timeout: overrides.check_timeout_ms.map(Duration::from_millis).unwrap_or(defaults.check_timeout),
            failure_threshold: overrides.failure_threshold.unwrap_or(defaults.failure_threshold),
            max_restarts: overrides.max_restarts.unwrap_or(defaults.max_restarts),
            restart_window: overrides
                .restart_window_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.restart_window),
            graceful_timeout: overrides
                .graceful_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.graceful_timeout),
            terminate_timeout: overrides
                .terminate_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.terminate_timeout),
        };
        apply_env_overrides(file_applied)
    }
}

fn env_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

fn env_u32(var: &str) -> Option<u32> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

/// `OA_*` tunable overrides, applied on top of whatever the descriptor
/// file already set (SPEC_FULL §10.3).
fn apply_env_overrides(base: SupervisorConfig) -> SupervisorConfig {
    SupervisorConfig {
        ready_deadline: env_duration_ms("OA_READY_DEADLINE_MS").unwrap_or(base.ready_deadline),
        check_interval: env_duration_ms("OA_CHECK_INTERVAL_MS").unwrap_or(base.check_interval),
        check_timeout: env_duration_ms("OA_CHECK_TIMEOUT_MS").unwrap_or(base.check_timeout),
        failure_threshold: env_u32("OA_FAILURE_THRESHOLD").unwrap_or(base.failure_threshold),
        max_restarts: env_u32("OA_MAX_RESTARTS").unwrap_or(base.max_restarts),
        restart_window: std::env::var("OA_RESTART_WINDOW_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(base.restart_window),
        graceful_timeout: env_duration_ms("OA_GRACEFUL_TIMEOUT_MS").unwrap_or(base.graceful_timeout),
        terminate_timeout: env_duration_ms("OA_TERMINATE_TIMEOUT_MS").unwrap_or(base.terminate_timeout),
    }
}

/// Errors loading or validating a descriptor file.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to read descriptor file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to parse descriptor file {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
    #[error("duplicate agent name in descriptor file: {0}")]
    DuplicateName(String),
    #[error("agent {0} not found")]
    UnknownAgent(String),
    #[error("agent {0} is already registered")]
    AlreadyRegistered(String),
    #[error("registry io error: {0}")]
    RegistryIo(#[from] std::io::Error),
    #[error("registry file corrupt: {0}")]
    RegistryCorrupt(#[from] serde_json::Error),
    #[error("process error for agent {agent}: {message}")]
    Process { agent: String, message: String },
}

impl SupervisorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SupervisorError::Read { .. }
            | SupervisorError::Parse { .. }
            | SupervisorError::DuplicateName(_)
            | SupervisorError::UnknownAgent(_)
            | SupervisorError::AlreadyRegistered(_) => ErrorKind::Operator,
            SupervisorError::RegistryIo(_) | SupervisorError::RegistryCorrupt(_) => ErrorKind::Operator,
            SupervisorError::Process { .. } => ErrorKind::Startup,
        }
    }
}

/// A TOML descriptor file's `[supervisor]` table, read alongside its
/// `[[agent]]` entries.
#[derive(Debug, Clone, Default, serde::Deserialize)]
struct DescriptorFileToml {
    #[serde(default, rename = "agent")]
    agent: Vec<AgentDescriptor>,
    #[serde(default)]
    supervisor: SupervisorOverrides,
}

/// Load one or more [`AgentDescriptor`]s and the resolved [`SupervisorConfig`]
/// from a TOML descriptor file (spec §4.1 `start <descriptor>`, SPEC_FULL
/// §10.3).
pub fn load_descriptor_file(path: &Path) -> Result<(Vec<AgentDescriptor>, SupervisorConfig), SupervisorError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|source| SupervisorError::Read { path: path.display().to_string(), source })?;
    let parsed: DescriptorFileToml =
        toml::from_str(&raw).map_err(|source| SupervisorError::Parse { path: path.display().to_string(), source })?;

    let mut seen = std::collections::HashSet::new();
    for agent in &parsed.agent {
        if !seen.insert(agent.name.clone()) {
            return Err(SupervisorError::DuplicateName(agent.name.to_string()));
        }
    }

    let config = SupervisorConfig::with_overrides(&parsed.supervisor);
    Ok((parsed.agent, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.ready_deadline, Duration::from_secs(30));
        assert_eq!(cfg.max_restarts, 5);
        assert_eq!(cfg.restart_window, Duration::from_secs(3600));
    }

    #[test]
    fn overrides_replace_only_the_named_fields() {
        let overrides = SupervisorOverrides { max_restarts: Some(10), ..Default::default() };
        let cfg = SupervisorConfig::with_overrides(&overrides);
        assert_eq!(cfg.max_restarts, 10);
        assert_eq!(cfg.ready_deadline, Duration::from_secs(30));
    }

    #[test]
    #[serial_test::serial(oa_supervisor_env)]
    fn environment_overrides_take_priority_over_the_descriptor_file() {
        std::env::set_var("OA_MAX_RESTARTS", "99");
        let overrides = SupervisorOverrides { max_restarts: Some(10), ..Default::default() };
        let cfg = SupervisorConfig::with_overrides(&overrides);
        std::env::remove_var("OA_MAX_RESTARTS");

        assert_eq!(cfg.max_restarts, 99, "an OA_* env var must win over the descriptor file's own override");
        assert_eq!(cfg.ready_deadline, Duration::from_secs(30), "fields neither layer touches keep the default");
    }

    #[test]
    fn loads_descriptor_file_with_multiple_agents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.toml");
        std::fs::write(
            &path,
            r#"
            [[agent]]
            name = "alice"
            port = 9001
            provider = "mock"
            model = "mock-1"
            role = "helpful assistant"

            [[agent]]
            name = "bob"
            port = 9002
            provider = "mock"
            model = "mock-1"
            role = "helpful assistant"

            [supervisor]
            max_restarts = 2
            "#,
        )
        .unwrap();

        let (agents, config) = load_descriptor_file(&path).unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(config.max_restarts, 2);
    }

    #[test]
    fn rejects_duplicate_agent_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.toml");
        std::fs::write(
            &path,
            r#"
            [[agent]]
            name = "alice"
            port = 9001
            provider = "mock"
            model = "mock-1"
            role = "a"

            [[agent]]
            name = "alice"
            port = 9002
            provider = "mock"
            model = "mock-1"
            role = "b"
            "#,
        )
        .unwrap();

        assert!(matches!(load_descriptor_file(&path), Err(SupervisorError::DuplicateName(_))));
    }
}
