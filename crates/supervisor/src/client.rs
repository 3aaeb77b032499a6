// SPDX-License-Identifier: MIT

//! Minimal control-socket client used by the supervisor for readiness
//! probes, health checks and shutdown requests (spec §4.1, §4.2).

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::UnixStream;

use oa_wire::{read_response, write_request, FramingError, Request, Response, ResponseFrame};

#[derive(Debug, Error)]
pub enum ControlClientError {
    #[error("failed to connect to control socket {path}: {source}")]
    Connect { path: String, #[source] source: std::io::Error },
    #[error("framing error talking to control socket: {0}")]
    Framing(#[from] FramingError),
    #[error("control socket replied with an event frame where a final response was expected")]
    UnexpectedEventFrame,
}

/// Connect to `socket_path`, send one request, and return its final
/// response. Every command except `chat`/`subscribe_events` replies with
/// exactly one final frame (see `oa_wire::control` docs), so this is the
/// right shape for the supervisor's own commands.
pub async fn send_request(
    socket_path: &Path,
    request: Request,
    timeout: Duration,
) -> Result<Response, ControlClientError> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|source| ControlClientError::Connect { path: socket_path.display().to_string(), source })?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_request(&mut write_half, &request, timeout).await?;
    match read_response(&mut reader, timeout).await? {
        ResponseFrame::Final(response) => Ok(response),
        ResponseFrame::Event(_) => Err(ControlClientError::UnexpectedEventFrame),
    }
}

/// Probe `Health` once, mapping connection failures to `Ok(None)` so callers
/// doing readiness polling can treat "not listening yet" as just another
/// round to retry rather than a hard error.
pub async fn probe_health(socket_path: &Path, timeout: Duration) -> Option<Response> {
    send_request(socket_path, Request::Health, timeout).await.ok()
}
