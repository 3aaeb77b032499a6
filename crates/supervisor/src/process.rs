// SPDX-License-Identifier: MIT

//! Process lifecycle: spawn, the readiness handshake, and the
//! terminate/kill shutdown escalation (spec §4.1).

use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use oa_core::descriptor::AgentDescriptor;
use oa_wire::Request;

use crate::client::send_request;
use crate::config::SupervisorConfig;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn agent binary {binary}: {source}")]
    Spawn { binary: String, #[source] source: std::io::Error },
    #[error("agent did not become ready within {0:?}")]
    ReadyTimeout(Duration),
    #[error("failed to signal process {pid}: {source}")]
    Signal { pid: u32, #[source] source: nix::Error },
    #[error("process did not exit after terminate and kill signals")]
    ShutdownTimeout,
}

/// Spawn the `oa-agent` binary for `descriptor`, pointing it at the
/// descriptor file written for it on disk.
pub fn spawn(agent_binary: &Path, descriptor_file: &Path) -> Result<Child, ProcessError> {
    Command::new(agent_binary)
        .arg(descriptor_file)
        .kill_on_drop(false)
        .spawn()
        .map_err(|source| ProcessError::Spawn { binary: agent_binary.display().to_string(), source })
}

/// Serialize `descriptor` to a small per-agent JSON file the spawned
/// process reads on startup.
pub fn write_descriptor_file(dir: &Path, descriptor: &AgentDescriptor) -> Result<PathBuf, std::io::Error> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", descriptor.name.as_str()));
    std::fs::write(&path, serde_json::to_vec_pretty(descriptor)?)?;
    Ok(path)
}

/// Poll the control socket's `Health` command with exponential backoff
/// (100ms initial, 1.5x factor, 2s cap) until it answers or `deadline`
/// elapses (spec §4.1).
pub async fn wait_until_ready(socket_path: &Path, deadline: Duration) -> Result<(), ProcessError> {
    let start = tokio::time::Instant::now();
    let mut backoff = Duration::from_millis(100);
    const CAP: Duration = Duration::from_secs(2);

    loop {
        if send_request(socket_path, Request::Health, Duration::from_secs(1)).await.is_ok() {
            return Ok(());
        }
        if start.elapsed() >= deadline {
            return Err(ProcessError::ReadyTimeout(deadline));
        }
        sleep(backoff.min(deadline.saturating_sub(start.elapsed()))).await;
        backoff = (backoff.mul_f32(1.5)).min(CAP);
    }
}

/// Escalating shutdown: ask nicely over the control socket, then SIGTERM,
/// then SIGKILL, honoring `graceful_timeout`/`terminate_timeout` between
/// steps (spec §4.1). Returns once the process has actually exited.
pub async fn shutdown(
    child: &mut Child,
    socket_path: &Path,
    config: &SupervisorConfig,
) -> Result<(), ProcessError> {
    let _ = send_request(socket_path, Request::Shutdown, Duration::from_secs(1)).await;
    if wait_for_exit(child, config.graceful_timeout).await {
        info!("agent exited after graceful shutdown request");
        return Ok(());
    }

    if let Some(pid) = child.id() {
        warn!(pid, "graceful shutdown timed out, sending SIGTERM");
        signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
            .map_err(|source| ProcessError::Signal { pid, source })?;
    }
    if wait_for_exit(child, config.terminate_timeout).await {
        info!("agent exited after SIGTERM");
        return Ok(());
    }

    if let Some(pid) = child.id() {
        warn!(pid, "terminate timed out, sending SIGKILL");
        signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL)
            .map_err(|source| ProcessError::Signal { pid, source })?;
    }
    if wait_for_exit(child, Duration::from_secs(5)).await {
        return Ok(());
    }

    Err(ProcessError::ShutdownTimeout)
}

async fn wait_for_exit(child: &mut Child, dur: Duration) -> bool {
    matches!(timeout(dur, child.wait()).await, Ok(Ok(_)))
}
