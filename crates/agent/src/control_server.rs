// SPDX-License-Identifier: MIT

//! Control-socket server: a Unix domain socket speaking the newline-JSON
//! protocol in `oa_wire::control` (spec §4.2, §5, §6).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use oa_core::conversation::{CorrelationId, Role};
use oa_wire::{read_request, write_response, FramingError, HealthStatus, MetricsFormat, Request, Response, ResponseFrame};

use crate::env;
use crate::runtime::AgentRuntime;

#[derive(Debug, Error)]
pub enum ControlServerError {
    #[error("failed to bind control socket at {path}: {source}")]
    Bind { path: PathBuf, #[source] source: std::io::Error },
}

/// Remove a stale socket file left behind by a crashed previous incarnation.
/// Mirrors the supervisor's own stale-socket handling on the client side
/// (spec §5: a dangling socket file must never wedge a fresh start).
fn clear_stale_socket(path: &Path) -> std::io::Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Bind the control socket, clearing any stale file left by a crashed prior
/// incarnation. Split from [`run`] so callers can flip readiness only after
/// the bind actually succeeds (spec §4.1 readiness handshake).
pub fn bind(socket_path: &Path) -> Result<UnixListener, ControlServerError> {
    if let Some(parent) = socket_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    clear_stale_socket(socket_path)
        .map_err(|source| ControlServerError::Bind { path: socket_path.to_path_buf(), source })?;

    let listener = UnixListener::bind(socket_path)
        .map_err(|source| ControlServerError::Bind { path: socket_path.to_path_buf(), source })?;
    info!(path = %socket_path.display(), "control socket listening");
    Ok(listener)
}

/// Serve an already-bound control socket until `shutdown` is cancelled.
pub async fn run(
    listener: UnixListener,
    socket_path: &Path,
    runtime: Arc<AgentRuntime>,
    shutdown: CancellationToken,
) -> Result<(), ControlServerError> {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("control socket shutting down");
                let _ = std::fs::remove_file(socket_path);
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let runtime = Arc::clone(&runtime);
                        let child_shutdown = shutdown.clone();
                        let conn_id = next_connection_id();
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, runtime, child_shutdown, conn_id).await {
                                warn!(error = %err, "control connection ended with error");
                            }
                        });
                    }
                    Err(err) => warn!(error = %err, "failed to accept control connection"),
                }
            }
        }
    }
}

fn next_connection_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

#[tracing::instrument(name = "control_connection", skip(stream, runtime, shutdown))]
async fn handle_connection(
    stream: UnixStream,
    runtime: Arc<AgentRuntime>,
    shutdown: CancellationToken,
    conn_id: u64,
) -> Result<(), FramingError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let timeout = env::ipc_timeout();

    loop {
        let request = match read_request(&mut reader, timeout).await {
            Ok(req) => req,
            Err(FramingError::ConnectionClosed) => return Ok(()),
            Err(err) => return Err(err),
        };

        match request {
            Request::SubscribeEvents { since_seq } => {
                stream_events(&mut write_half, &runtime, since_seq, timeout).await?;
                return Ok(());
            }
            Request::Chat { message, correlation_id } => {
                handle_chat(&mut write_half, &runtime, message, correlation_id, timeout).await?;
            }
            Request::Shutdown => {
                write_response(&mut write_half, &ResponseFrame::Final(Response::ShuttingDown), timeout).await?;
                shutdown.cancel();
                return Ok(());
            }
            other => {
                let response = handle_simple(&runtime, other);
                write_response(&mut write_half, &ResponseFrame::Final(response), timeout).await?;
            }
        }
    }
}

fn handle_simple(runtime: &AgentRuntime, request: Request) -> Response {
    match request {
        Request::Health => Response::Health {
            status: if runtime.is_ready() { HealthStatus::Ready } else { HealthStatus::Starting },
            peer_port: runtime.peer_port(),
            peers: runtime.routing().snapshot().keys().cloned().collect(),
            uptime_s: runtime.uptime_s(),
        },
        Request::Connect { peer, endpoint } => match runtime.routing().connect(&peer, &endpoint) {
            Ok(changed) => {
                if changed {
                    runtime.record_connect_event(&peer);
                }
                Response::Connected
            }
            Err(err) => Response::error(err.to_string()),
        },
        Request::Disconnect { peer } => {
            if runtime.routing().disconnect(&peer) {
                runtime.record_disconnect_event(&peer);
            }
            Response::Disconnected
        }
        Request::ListConnections => Response::Connections { peers: (*runtime.routing().snapshot()).clone() },
        Request::Metrics { format } => {
            let snapshot = runtime.metrics_snapshot();
            match format {
                MetricsFormat::Json => Response::MetricsJson { metrics: snapshot },
                MetricsFormat::Prometheus => {
                    Response::MetricsPrometheus { body: snapshot.to_prometheus(runtime.name()) }
                }
            }
        }
        Request::Health | Request::SubscribeEvents { .. } | Request::Chat { .. } | Request::Shutdown => {
            unreachable!("handled by caller before reaching handle_simple")
        }
    }
}

/// Drive one `chat` exchange: stream every event tagged with this
/// conversation's correlation id as it's published, then write the final
/// reply once the reasoning loop quiesces (spec §4.2: "streamed events +
/// final `{status:"ok", response}`").
async fn handle_chat(
    write_half: &mut (impl tokio::io::AsyncWrite + Unpin),
    runtime: &Arc<AgentRuntime>,
    message: String,
    correlation_id: Option<String>,
    timeout: Duration,
) -> Result<(), FramingError> {
    let cid = correlation_id
        .and_then(|s| s.parse::<CorrelationId>().ok())
        .unwrap_or_default();

    let (_replay, mut events) = runtime.events().subscribe(None);
    let turn = runtime.reasoning().process_turn(cid, Role::User, message, None);
    tokio::pin!(turn);

    loop {
        tokio::select! {
            result = &mut turn => {
                return match result {
                    Ok(response) => {
                        write_response(write_half, &ResponseFrame::Final(Response::ChatComplete { response }), timeout)
                            .await
                    }
                    Err(err) => {
                        write_response(write_half, &ResponseFrame::Final(Response::error(err.to_string())), timeout).await
                    }
                };
            }
            Some(event) = events.recv() => {
                if event.correlation_id == Some(cid) {
                    write_response(write_half, &ResponseFrame::Event(event), timeout).await?;
                }
            }
        }
    }
}

async fn stream_events(
    write_half: &mut (impl tokio::io::AsyncWrite + Unpin),
    runtime: &Arc<AgentRuntime>,
    since_seq: Option<u64>,
    timeout: Duration,
) -> Result<(), FramingError> {
    let (replay, mut rx) = runtime.events().subscribe(since_seq);
    for event in replay {
        write_response(write_half, &ResponseFrame::Event(event), timeout).await?;
    }
    while let Some(event) = rx.recv().await {
        write_response(write_half, &ResponseFrame::Event(event), timeout).await?;
    }
    Ok(())
}
