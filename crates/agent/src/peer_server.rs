// SPDX-License-Identifier: MIT

//! Inbound peer-transport server: a plain HTTP listener exposing one route,
//! `POST /mcp`, carrying the JSON-RPC-shaped body defined in
//! `oa_wire::peer` (spec §4.4, §6).

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request as HttpRequest, Response as HttpResponse, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use oa_core::conversation::{CorrelationId, Role};
use oa_wire::{PeerError, PeerRequest, PeerResponse, StatusResult};

use crate::runtime::AgentRuntime;

#[derive(Debug, Error)]
pub enum PeerServerError {
    #[error("failed to bind peer transport on port {port}: {source}")]
    Bind { port: u16, #[source] source: std::io::Error },
}

/// Bind the peer transport TCP listener. Split from [`run`] so callers can
/// flip readiness only after the bind actually succeeds.
pub async fn bind(port: u16) -> Result<TcpListener, PeerServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener =
        TcpListener::bind(addr).await.map_err(|source| PeerServerError::Bind { port, source })?;
    info!(%addr, "peer transport listening");
    Ok(listener)
}

/// Serve an already-bound peer transport listener until `shutdown` fires.
pub async fn run(listener: TcpListener, runtime: Arc<AgentRuntime>, shutdown: CancellationToken) -> Result<(), PeerServerError> {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("peer transport shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        let runtime = Arc::clone(&runtime);
                        let io = TokioIo::new(stream);
                        tokio::spawn(async move {
                            let service = service_fn(move |req| handle(req, Arc::clone(&runtime)));
                            if let Err(err) = ConnBuilder::new(hyper_util::rt::TokioExecutor::new())
                                .serve_connection(io, service)
                                .await
                            {
                                warn!(%peer_addr, error = %err, "peer connection ended with error");
                            }
                        });
                    }
                    Err(err) => warn!(error = %err, "failed to accept peer connection"),
                }
            }
        }
    }
}

async fn handle(
    req: HttpRequest<Incoming>,
    runtime: Arc<AgentRuntime>,
) -> Result<HttpResponse<Full<Bytes>>, Infallible> {
    if req.method() != hyper::Method::POST || req.uri().path() != "/mcp" {
        return Ok(text_response(StatusCode::NOT_FOUND, "not found"));
    }

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return Ok(text_response(StatusCode::BAD_REQUEST, "failed to read body")),
    };

    let parsed: Result<PeerRequest, _> = serde_json::from_slice(&body);
    let request = match parsed {
        Ok(r) => r,
        Err(_) => return Ok(text_response(StatusCode::BAD_REQUEST, "malformed request")),
    };

    let id = request.id;
    let response = dispatch(request, &runtime).await;
    let json = serde_json::to_vec(&response).unwrap_or_else(|_| {
        serde_json::to_vec(&PeerResponse::err(id, PeerError::internal("failed to encode response")))
            .unwrap_or_default()
    });

    Ok(HttpResponse::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|_| HttpResponse::new(Full::new(Bytes::new()))))
}

async fn dispatch(request: PeerRequest, runtime: &Arc<AgentRuntime>) -> PeerResponse {
    match request.method.as_str() {
        "receive_message" => receive_message(request, runtime).await,
        "chat_with_user" => chat_with_user(request, runtime).await,
        "status" => status(request, runtime),
        other => PeerResponse::err(request.id, PeerError::unknown_method(other)),
    }
}

async fn receive_message(request: PeerRequest, runtime: &Arc<AgentRuntime>) -> PeerResponse {
    let id = request.id;
    let from = request.params.get("from").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
    let message = request.params.get("message").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let cid = request
        .params
        .get("correlation_id")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<CorrelationId>().ok())
        .unwrap_or_default();

    runtime.events().publish(
        oa_core::event::EventKind::PeerMessageReceived { from: from.clone() },
        Some(cid),
        Some(from.clone()),
    );

    match runtime.reasoning().process_turn(cid, Role::Peer, message, Some(from)).await {
        Ok(reply) => PeerResponse::ok(id, serde_json::json!({ "reply": reply })),
        Err(err) => PeerResponse::err(id, PeerError::internal(err.to_string())),
    }
}

async fn chat_with_user(request: PeerRequest, runtime: &Arc<AgentRuntime>) -> PeerResponse {
    let id = request.id;
    let message = request.params.get("message").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let cid = request
        .params
        .get("correlation_id")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<CorrelationId>().ok())
        .unwrap_or_default();

    match runtime.reasoning().process_turn(cid, Role::User, message, None).await {
        Ok(reply) => PeerResponse::ok(id, serde_json::json!({ "reply": reply })),
        Err(err) => PeerResponse::err(id, PeerError::internal(err.to_string())),
    }
}

fn status(request: PeerRequest, runtime: &Arc<AgentRuntime>) -> PeerResponse {
    let result = StatusResult {
        name: runtime.name().to_string(),
        peers: runtime.routing().snapshot().keys().cloned().collect(),
        uptime_s: runtime.uptime_s(),
    };
    PeerResponse::ok(request.id, serde_json::to_value(result).unwrap_or(serde_json::Value::Null))
}

fn text_response(status: StatusCode, body: &'static str) -> HttpResponse<Full<Bytes>> {
    HttpResponse::builder()
        .status(status)
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|_| HttpResponse::new(Full::new(Bytes::new())))
}
