// SPDX-License-Identifier: MIT

//! The supervisor: owns every agent's process lifecycle, persists state to
//! the registry, and runs the health/restart loop (spec §4.1, §6).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::process::Child;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use oa_core::descriptor::AgentDescriptor;
use oa_core::record::{AgentProcessRecord, AgentStatus};
use oa_wire::{MetricsFormat, Request, Response};

use crate::client::send_request;
use crate::config::{SupervisorConfig, SupervisorError};
use crate::process;
use crate::registry::Registry;

fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Per-agent background state: the cancel token that tears down its
/// health-loop task (and, through it, the process) on `stop`.
struct AgentHandle {
    cancel: CancellationToken,
}

/// Owns every agent this process has started or adopted from the registry.
pub struct Supervisor {
    registry: Registry,
    descriptor_dir: PathBuf,
    agent_binary: PathBuf,
    config: SupervisorConfig,
    handles: Arc<Mutex<HashMap<String, AgentHandle>>>,
}

impl Supervisor {
    pub fn new(agent_binary: PathBuf, config: SupervisorConfig) -> Self {
        let runtime_dir = oa_core::paths::runtime_dir();
        Self {
            registry: Registry::at_default_path(),
            descriptor_dir: runtime_dir.join("descriptors"),
            agent_binary,
            config,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a descriptor with the registry without starting it. No-op
    /// (not an error) if already registered with the same descriptor;
    /// rejects re-registering a different descriptor under the same name.
    pub fn add(&self, descriptor: AgentDescriptor) -> Result<(), SupervisorError> {
        let name = descriptor.name.to_string();
        let socket = oa_core::paths::control_socket_path(&name).display().to_string();
        self.registry.mutate(|records| {
            if let Some(existing) = records.get(&name) {
                if existing.descriptor != descriptor {
                    return Err(SupervisorError::AlreadyRegistered(name.clone()));
                }
                return Ok(());
            }
            records.insert(name.clone(), AgentProcessRecord::new(descriptor, socket));
            Ok(())
        })
    }

    fn socket_path(name: &str) -> PathBuf {
        oa_core::paths::control_socket_path(name)
    }

    /// Spawn the agent process, wait for readiness, and start its
    /// health-loop task.
    pub async fn start(&self, name: &str) -> Result<(), SupervisorError> {
        let descriptor = self
            .registry
            .load()?
            .get(name)
            .map(|r| r.descriptor.clone())
            .ok_or_else(|| SupervisorError::UnknownAgent(name.to_string()))?;

        let descriptor_file = process::write_descriptor_file(&self.descriptor_dir, &descriptor)
            .map_err(|e| SupervisorError::Process { agent: name.to_string(), message: e.to_string() })?;

        let mut child = process::spawn(&self.agent_binary, &descriptor_file)
            .map_err(|e| SupervisorError::Process { agent: name.to_string(), message: e.to_string() })?;
        let pid = child.id();

        let socket_path = Self::socket_path(name);
        if let Err(err) = process::wait_until_ready(&socket_path, self.config.ready_deadline).await {
            let _ = child.start_kill();
            let _ = child.wait().await;
            let _ = std::fs::remove_file(&socket_path);
            self.mark_failed(name)?;
            return Err(SupervisorError::Process { agent: name.to_string(), message: err.to_string() });
        }

        let started_at_ms = epoch_ms();
        self.registry.mutate(|records| {
            if let Some(record) = records.get_mut(name) {
                record.status = AgentStatus::Running;
                record.pid = pid;
                record.started_at_ms = Some(started_at_ms);
                record.consecutive_failures = 0;
                record.window_started_at_ms = Some(started_at_ms);
            }
            Ok(())
        })?;

        let cancel = CancellationToken::new();
        self.handles.lock().insert(name.to_string(), AgentHandle { cancel: cancel.clone() });

        self.spawn_health_loop(name.to_string(), child, cancel);
        info!(agent = name, "agent started");
        Ok(())
    }

    /// Start every registered agent. Runs all starts concurrently (spec
    /// §4.1: "for each descriptor in parallel: fork a child…"); one agent's
    /// failure is reported alongside the rest and never aborts its peers.
    pub async fn start_all(&self) -> Result<Vec<(String, Result<(), SupervisorError>)>, SupervisorError> {
        let names: Vec<String> = self.registry.load()?.keys().cloned().collect();
        let results = futures_util::future::join_all(
            names.into_iter().map(|name| async move {
                let result = self.start(&name).await;
                (name, result)
            }),
        )
        .await;
        Ok(results)
    }

    fn mark_failed(&self, name: &str) -> Result<(), SupervisorError> {
        self.registry.mutate(|records| {
            if let Some(record) = records.get_mut(name) {
                record.status = AgentStatus::Failed;
            }
            Ok(())
        })
    }

    fn spawn_health_loop(&self, name: String, child: Child, cancel: CancellationToken) {
        let registry_path = self.registry.path().to_path_buf();
        let config = self.config;
        let agent_binary = self.agent_binary.clone();
        let descriptor_dir = self.descriptor_dir.clone();
        let handles = Arc::clone(&self.handles);

        tokio::spawn(async move {
            let registry = Registry::new(registry_path);
            let mut child = child;
            let socket_path = Self::socket_path(&name);
            let mut ticker = interval(config.check_interval);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = process::shutdown(&mut child, &socket_path, &config).await;
                        let _ = registry.mutate(|records| {
                            if let Some(record) = records.get_mut(&name) {
                                record.status = AgentStatus::Stopped;
                                record.pid = None;
                            }
                            Ok(())
                        });
                        handles.lock().remove(&name);
                        return;
                    }
                    _ = ticker.tick() => {
                        let healthy =
                            send_request(&socket_path, Request::Health, config.check_timeout).await.is_ok();
                        if healthy {
                            let _ = registry.mutate(|records| {
                                if let Some(record) = records.get_mut(&name) {
                                    record.consecutive_failures = 0;
                                    if record.status == AgentStatus::Unhealthy {
                                        record.status = AgentStatus::Running;
                                    }
                                }
                                Ok(())
                            });
                            continue;
                        }

                        warn!(agent = %name, "health check failed");
                        let restart_needed = registry
                            .mutate(|records| {
                                let Some(record) = records.get_mut(&name) else { return Ok(()) };
                                record.consecutive_failures += 1;
                                if record.status == AgentStatus::Running {
                                    record.status = AgentStatus::Unhealthy;
                                }
                                Ok(())
                            })
                            .is_ok()
                            && registry
                                .load()
                                .ok()
                                .and_then(|r| r.get(&name).map(|r| r.consecutive_failures))
                                .unwrap_or(0)
                                >= config.failure_threshold;

                        if restart_needed {
                            let can_restart = within_restart_budget(&registry, &name, &config);
                            if !can_restart {
                                warn!(agent = %name, "restart budget exhausted, marking failed");
                                let _ = registry.mutate(|records| {
                                    if let Some(record) = records.get_mut(&name) {
                                        record.status = AgentStatus::Failed;
                                    }
                                    Ok(())
                                });
                                handles.lock().remove(&name);
                                return;
                            }

                            let _ = process::shutdown(&mut child, &socket_path, &config).await;
                            match restart_process(&agent_binary, &descriptor_dir, &registry, &name, &config).await {
                                Ok(new_child) => {
                                    child = new_child;
                                }
                                Err(err) => {
                                    warn!(agent = %name, error = %err, "restart failed");
                                    let _ = registry.mutate(|records| {
                                        if let Some(record) = records.get_mut(&name) {
                                            record.status = AgentStatus::Failed;
                                        }
                                        Ok(())
                                    });
                                    handles.lock().remove(&name);
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        });
    }

    pub async fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        let cancel = self.handles.lock().get(name).map(|h| h.cancel.clone());
        match cancel {
            Some(cancel) => {
                cancel.cancel();
                Ok(())
            }
            None => self.registry.mutate(|records| {
                if let Some(record) = records.get_mut(name) {
                    record.status = AgentStatus::Stopped;
                    record.pid = None;
                }
                Ok(())
            }),
        }
    }

    /// Stop every currently-running agent concurrently, each still bounded
    /// by its own graceful/terminate timeouts (spec §4.1); one agent's
    /// failure is reported alongside the rest and never aborts its peers.
    pub async fn stop_all(&self) -> Result<Vec<(String, Result<(), SupervisorError>)>, SupervisorError> {
        let names: Vec<String> = self.handles.lock().keys().cloned().collect();
        let results = futures_util::future::join_all(
            names.into_iter().map(|name| async move {
                let result = self.stop(&name).await;
                (name, result)
            }),
        )
        .await;
        Ok(results)
    }

    /// Restart preserves the descriptor but not any in-process state: the
    /// new incarnation starts with an empty routing table (spec §8 law:
    /// "restart preserves descriptor, resets routing table").
    pub async fn restart(&self, name: &str) -> Result<(), SupervisorError> {
        self.stop(name).await?;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while self.handles.lock().contains_key(name) {
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.start(name).await
    }

    pub async fn connect(&self, a: &str, b: &str, bidirectional: bool) -> Result<(), SupervisorError> {
        self.connect_one(a, b).await?;
        if bidirectional {
            self.connect_one(b, a).await?;
        }
        Ok(())
    }

    async fn connect_one(&self, from: &str, to: &str) -> Result<(), SupervisorError> {
        let records = self.registry.load()?;
        let to_endpoint = records
            .get(to)
            .map(|r| format!("http://127.0.0.1:{}/mcp", r.descriptor.port))
            .ok_or_else(|| SupervisorError::UnknownAgent(to.to_string()))?;
        let socket = Self::socket_path(from);
        send_request(&socket, Request::Connect { peer: to.to_string(), endpoint: to_endpoint }, Duration::from_secs(5))
            .await
            .map_err(|e| SupervisorError::Process { agent: from.to_string(), message: e.to_string() })?;
        Ok(())
    }

    pub async fn disconnect(&self, a: &str, b: &str) -> Result<(), SupervisorError> {
        let socket = Self::socket_path(a);
        send_request(&socket, Request::Disconnect { peer: b.to_string() }, Duration::from_secs(5))
            .await
            .map_err(|e| SupervisorError::Process { agent: a.to_string(), message: e.to_string() })?;
        Ok(())
    }

    pub fn status(&self) -> Result<HashMap<String, AgentProcessRecord>, SupervisorError> {
        self.registry.load()
    }

    pub async fn health(&self, name: &str) -> Result<Response, SupervisorError> {
        let socket = Self::socket_path(name);
        send_request(&socket, Request::Health, Duration::from_secs(5))
            .await
            .map_err(|e| SupervisorError::Process { agent: name.to_string(), message: e.to_string() })
    }

    pub async fn metrics(&self, name: &str, format: MetricsFormat) -> Result<Response, SupervisorError> {
        let socket = Self::socket_path(name);
        send_request(&socket, Request::Metrics { format }, Duration::from_secs(5))
            .await
            .map_err(|e| SupervisorError::Process { agent: name.to_string(), message: e.to_string() })
    }

    pub async fn chat(&self, name: &str, message: String) -> Result<String, SupervisorError> {
        let socket = Self::socket_path(name);
        let response = send_request(
            &socket,
            Request::Chat { message, correlation_id: None },
            Duration::from_secs(120),
        )
        .await
        .map_err(|e| SupervisorError::Process { agent: name.to_string(), message: e.to_string() })?;

        match response {
            Response::ChatComplete { response } => Ok(response),
            Response::Error { message } => Err(SupervisorError::Process { agent: name.to_string(), message }),
            _ => Err(SupervisorError::Process {
                agent: name.to_string(),
                message: "unexpected response to chat".to_string(),
            }),
        }
    }
}

fn within_restart_budget(registry: &Registry, name: &str, config: &SupervisorConfig) -> bool {
    let Ok(records) = registry.load() else { return false };
    let Some(record) = records.get(name) else { return false };

    let now = epoch_ms();
    let window_start = record.window_started_at_ms.unwrap_or(now);
    let window_elapsed = Duration::from_millis(now.saturating_sub(window_start));

    if window_elapsed > config.restart_window {
        // Window expired: a fresh window starts on this restart attempt.
        return true;
    }
    record.restarts_in_window < config.max_restarts
}

async fn restart_process(
    agent_binary: &std::path::Path,
    descriptor_dir: &std::path::Path,
    registry: &Registry,
    name: &str,
    config: &SupervisorConfig,
) -> Result<Child, SupervisorError> {
    let descriptor = registry
        .load()?
        .get(name)
        .map(|r| r.descriptor.clone())
        .ok_or_else(|| SupervisorError::UnknownAgent(name.to_string()))?;

    let descriptor_file = process::write_descriptor_file(descriptor_dir, &descriptor)
        .map_err(|e| SupervisorError::Process { agent: name.to_string(), message: e.to_string() })?;
    let mut child = process::spawn(agent_binary, &descriptor_file)
        .map_err(|e| SupervisorError::Process { agent: name.to_string(), message: e.to_string() })?;

    let socket_path = oa_core::paths::control_socket_path(name);
    if let Err(err) = process::wait_until_ready(&socket_path, config.ready_deadline).await {
        let _ = child.start_kill();
        return Err(SupervisorError::Process { agent: name.to_string(), message: err.to_string() });
    }

    let now = epoch_ms();
    registry.mutate(|records| {
        if let Some(record) = records.get_mut(name) {
            let window_start = record.window_started_at_ms.unwrap_or(now);
            let window_elapsed = Duration::from_millis(now.saturating_sub(window_start));
            if window_elapsed > config.restart_window {
                record.window_started_at_ms = Some(now);
                record.restarts_in_window = 0;
            }
            record.restarts_in_window += 1;
            record.status = AgentStatus::Running;
            record.pid = child.id();
            record.started_at_ms = Some(now);
            record.consecutive_failures = 0;
        }
        Ok(())
    })?;

    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oa_core::name::AgentName;
    use oa_core::record::AgentProcessRecord;

    fn record_with_budget(restarts_in_window: u32, window_started_at_ms: Option<u64>) -> AgentProcessRecord {
        let descriptor = AgentDescriptor::new(AgentName::new("alice").unwrap(), 9001, "mock", "mock-1", "role");
        let mut record = AgentProcessRecord::new(descriptor, "/tmp/alice.sock".into());
        record.restarts_in_window = restarts_in_window;
        record.window_started_at_ms = window_started_at_ms;
        record
    }

    /// Scenario 3: `failure_threshold=2, max_restarts=3, window=60s` should
    /// permit exactly 3 restarts inside the window and deny the 4th.
    #[test]
    fn restart_budget_allows_exactly_max_restarts_within_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path().join("registry.json"));
        let config = SupervisorConfig {
            max_restarts: 3,
            restart_window: Duration::from_secs(60),
            ..SupervisorConfig::default()
        };
        let now = epoch_ms();

        for used in 0..3 {
            registry.mutate(|r| {
                r.insert("alice".into(), record_with_budget(used, Some(now)));
                Ok(())
            }).unwrap();
            assert!(within_restart_budget(&registry, "alice", &config), "restart {used} of 3 should be allowed");
        }

        registry.mutate(|r| {
            r.insert("alice".into(), record_with_budget(3, Some(now)));
            Ok(())
        }).unwrap();
        assert!(!within_restart_budget(&registry, "alice", &config), "4th restart within the window must be denied");
    }

    #[test]
    fn restart_budget_resets_once_the_window_has_elapsed() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path().join("registry.json"));
        let config = SupervisorConfig {
            max_restarts: 3,
            restart_window: Duration::from_secs(60),
            ..SupervisorConfig::default()
        };
        let stale_window_start = epoch_ms().saturating_sub(Duration::from_secs(120).as_millis() as u64);

        registry.mutate(|r| {
            r.insert("alice".into(), record_with_budget(3, Some(stale_window_start)));
            Ok(())
        }).unwrap();
        assert!(within_restart_budget(&registry, "alice", &config), "an elapsed window must allow a fresh attempt");
    }

    #[test]
    #[serial_test::serial(oa_runtime_dir)]
    fn add_registers_a_new_descriptor() {
        std::env::set_var("OA_RUNTIME_DIR", tempfile::tempdir().unwrap().path());
        let supervisor = Supervisor::new(PathBuf::from("oa-agent"), SupervisorConfig::default());
        let descriptor =
            AgentDescriptor::new(AgentName::new("alice").unwrap(), 9001, "mock", "mock-1", "helpful");
        supervisor.add(descriptor.clone()).unwrap();
        let status = supervisor.status().unwrap();
        assert_eq!(status.get("alice").unwrap().descriptor, descriptor);
        std::env::remove_var("OA_RUNTIME_DIR");
    }

    #[test]
    #[serial_test::serial(oa_runtime_dir)]
    fn re_adding_the_same_descriptor_is_not_an_error() {
        std::env::set_var("OA_RUNTIME_DIR", tempfile::tempdir().unwrap().path());
        let supervisor = Supervisor::new(PathBuf::from("oa-agent"), SupervisorConfig::default());
        let descriptor =
            AgentDescriptor::new(AgentName::new("alice").unwrap(), 9001, "mock", "mock-1", "helpful");
        supervisor.add(descriptor.clone()).unwrap();
        assert!(supervisor.add(descriptor).is_ok());
        std::env::remove_var("OA_RUNTIME_DIR");
    }

    #[test]
    #[serial_test::serial(oa_runtime_dir)]
    fn re_adding_a_conflicting_descriptor_is_rejected() {
        std::env::set_var("OA_RUNTIME_DIR", tempfile::tempdir().unwrap().path());
        let supervisor = Supervisor::new(PathBuf::from("oa-agent"), SupervisorConfig::default());
        let first = AgentDescriptor::new(AgentName::new("alice").unwrap(), 9001, "mock", "mock-1", "helpful");
        let conflicting = AgentDescriptor::new(AgentName::new("alice").unwrap(), 9002, "mock", "mock-1", "helpful");
        supervisor.add(first).unwrap();
        assert!(matches!(supervisor.add(conflicting), Err(SupervisorError::AlreadyRegistered(_))));
        std::env::remove_var("OA_RUNTIME_DIR");
    }

    #[tokio::test]
    #[serial_test::serial(oa_runtime_dir)]
    async fn start_all_attempts_every_agent_even_when_every_start_fails() {
        std::env::set_var("OA_RUNTIME_DIR", tempfile::tempdir().unwrap().path());
        let supervisor = Supervisor::new(PathBuf::from("/nonexistent/oa-agent-binary"), SupervisorConfig::default());
        for (name, port) in [("alice", 9001), ("bob", 9002), ("carol", 9003)] {
            let descriptor = AgentDescriptor::new(AgentName::new(name).unwrap(), port, "mock", "mock-1", "helpful");
            supervisor.add(descriptor).unwrap();
        }

        let results = supervisor.start_all().await.unwrap();
        let mut names: Vec<_> = results.iter().map(|(n, _)| n.clone()).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["alice".to_string(), "bob".to_string(), "carol".to_string()],
            "every registered agent must be attempted, not just the ones before the first failure"
        );
        assert!(results.iter().all(|(_, r)| r.is_err()), "a nonexistent agent binary must fail every start");
        std::env::remove_var("OA_RUNTIME_DIR");
    }

    #[tokio::test]
    #[serial_test::serial(oa_runtime_dir)]
    async fn stop_all_stops_every_handle_even_if_one_were_to_fail() {
        std::env::set_var("OA_RUNTIME_DIR", tempfile::tempdir().unwrap().path());
        let supervisor = Supervisor::new(PathBuf::from("oa-agent"), SupervisorConfig::default());
        for name in ["alice", "bob"] {
            supervisor.handles.lock().insert(name.to_string(), AgentHandle { cancel: CancellationToken::new() });
        }

        let results = supervisor.stop_all().await.unwrap();
        let mut names: Vec<_> = results.iter().map(|(n, _)| n.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        std::env::remove_var("OA_RUNTIME_DIR");
    }
}
