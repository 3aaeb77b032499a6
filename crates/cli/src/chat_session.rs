// SPDX-License-Identifier: MIT

//! Interactive/verbose `chat` transport: talks directly to an agent's
//! control socket so streamed `event` frames can be printed as they arrive,
//! ahead of the final `chat_complete` response (spec §4.2).

use std::path::Path;

use anyhow::{anyhow, Result};
use oa_core::EventKind;
use oa_wire::{read_response, write_request, Request, Response, ResponseFrame};
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::time::Duration;

use crate::color;

/// Send one `chat` request over a fresh connection and return the final
/// reply, printing each streamed event along the way if `verbose`.
pub async fn chat_once(socket_path: &Path, message: String, verbose: bool) -> Result<String> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| anyhow!("failed to connect to {}: {e}", socket_path.display()))?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let timeout = Duration::from_secs(120);
    write_request(&mut write_half, &Request::Chat { message, correlation_id: None }, timeout).await?;

    loop {
        match read_response(&mut reader, timeout).await? {
            ResponseFrame::Event(event) => {
                if verbose {
                    print_event(&event.kind);
                }
            }
            ResponseFrame::Final(Response::ChatComplete { response }) => return Ok(response),
            ResponseFrame::Final(Response::Error { message }) => return Err(anyhow!(message)),
            ResponseFrame::Final(other) => return Err(anyhow!("unexpected reply to chat: {other:?}")),
        }
    }
}

fn print_event(kind: &EventKind) {
    match kind {
        EventKind::ToolCallStarted { tool, .. } => {
            println!("{}", color::muted(&format!("  -> calling {tool}")));
        }
        EventKind::ToolCallFinished { tool, ok, .. } => {
            println!("{}", color::muted(&format!("  <- {tool} ({})", if *ok { "ok" } else { "error" })));
        }
        EventKind::PeerMessageReceived { from, .. } => {
            println!("{}", color::muted(&format!("  peer message from {from}")));
        }
        EventKind::TurnCapped { iterations } => {
            println!("{}", color::muted(&format!("  turn capped after {iterations} iterations")));
        }
        _ => {}
    }
}
