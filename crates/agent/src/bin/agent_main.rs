// SPDX-License-Identifier: MIT

//! `oa-agent`: the per-agent runtime process. Spawned by the supervisor
//! (spec §4.1) with the path to its descriptor file as the sole argument;
//! runs until it receives a `shutdown` control command or a terminate
//! signal.

use std::path::PathBuf;
use std::sync::Arc;

use oa_agent::{control_server, env, logging, peer_server, AgentRuntime};
use oa_core::descriptor::AgentDescriptor;
use oa_provider::{HttpJsonProvider, ModelProvider, MockProvider};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn load_descriptor(path: &std::path::Path) -> anyhow::Result<AgentDescriptor> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Resolve a concrete [`ModelProvider`] from the descriptor's `provider`
/// field. Anything starting with `http://` or `https://` is treated as an
/// `HttpJsonProvider` endpoint (spec §4.3, SPEC_FULL §10.6); anything else
/// is a mock provider, scripted from `descriptor.mock_script` or the
/// `OA_MOCK_SCRIPT` environment variable when present (spec §8 scenarios 1
/// and 5 need a specific scripted exchange, not the fixed echo reply), and
/// falling back to a single fixed echo response otherwise.
fn build_provider(descriptor: &AgentDescriptor) -> anyhow::Result<Arc<dyn ModelProvider>> {
    if descriptor.provider.starts_with("http://") || descriptor.provider.starts_with("https://") {
        return Ok(Arc::new(HttpJsonProvider::new(descriptor.provider.clone(), true)));
    }

    if let Some(script) = descriptor.mock_script.clone().or_else(env::mock_script) {
        let provider = oa_provider::parse_mock_script(false, &script)
            .map_err(|err| anyhow::anyhow!("invalid mock_script for agent {}: {err}", descriptor.name.as_str()))?;
        return Ok(Arc::new(provider));
    }

    Ok(Arc::new(MockProvider::new(
        false,
        vec![oa_provider::ModelResponse { text: "(mock provider: no model configured)".into(), tool_calls: vec![] }],
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let descriptor_path = std::env::args().nth(1).ok_or_else(|| anyhow::anyhow!("usage: oa-agent <descriptor.json>"))?;
    let descriptor = load_descriptor(&PathBuf::from(descriptor_path))?;

    let _log_guard = logging::init(env::log_dir().as_deref(), descriptor.name.as_str())?;
    info!(agent = descriptor.name.as_str(), port = descriptor.port, "starting agent runtime");

    let provider = build_provider(&descriptor)?;
    let socket_path = env::control_socket_path(descriptor.name.as_str());
    let peer_port = descriptor.port;
    let runtime = Arc::new(AgentRuntime::new(descriptor, provider));

    let control_listener = control_server::bind(&socket_path)?;
    let peer_listener = peer_server::bind(peer_port).await?;
    runtime.mark_ready();
    info!("agent runtime ready");

    let shutdown = CancellationToken::new();

    let control_shutdown = shutdown.clone();
    let control_runtime = Arc::clone(&runtime);
    let control_socket_path = socket_path.clone();
    let control_task = tokio::spawn(async move {
        if let Err(err) = control_server::run(control_listener, &control_socket_path, control_runtime, control_shutdown).await {
            error!(error = %err, "control server exited with error");
        }
    });

    let peer_shutdown = shutdown.clone();
    let peer_runtime = Arc::clone(&runtime);
    let peer_task = tokio::spawn(async move {
        if let Err(err) = peer_server::run(peer_listener, peer_runtime, peer_shutdown).await {
            error!(error = %err, "peer server exited with error");
        }
    });

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();

    let _ = tokio::join!(control_task, peer_task);
    Ok(())
}
