// SPDX-License-Identifier: MIT

//! Resolves and executes one model-issued tool call: either a
//! `communicate_with_<peer>` call against the routing table, or an external
//! tool endpoint from the descriptor (spec §4.3 step 5, §9).

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use oa_core::clock::Clock;
use oa_core::conversation::CorrelationId;
use oa_core::descriptor::ToolEndpoint;
use oa_core::event::EventKind;
use oa_core::name::AgentName;
use oa_core::routing::RoutingTable;
use oa_provider::ToolInvocation;

use crate::capabilities::peer_name_from_tool;
use crate::event_bus::EventBus;
use crate::live_metrics::LiveMetrics;
use crate::peer_client::{PeerCallError, PeerClient};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("peer call failed: {0}")]
    PeerCall(#[from] PeerCallError),
}

pub struct ToolDispatcher<C: Clock> {
    self_name: AgentName,
    routing: Arc<RoutingTable>,
    external_tools: Vec<ToolEndpoint>,
    client: PeerClient,
    events: Arc<EventBus<C>>,
    metrics: Arc<LiveMetrics>,
}

impl<C: Clock> ToolDispatcher<C> {
    pub fn new(
        self_name: AgentName,
        routing: Arc<RoutingTable>,
        external_tools: Vec<ToolEndpoint>,
        client: PeerClient,
        events: Arc<EventBus<C>>,
        metrics: Arc<LiveMetrics>,
    ) -> Self {
        Self { self_name, routing, external_tools, client, events, metrics }
    }

    /// Execute one tool invocation, emitting `tool_call_started`/
    /// `tool_call_finished` events around it, in order (spec §4.3).
    pub async fn dispatch(
        &self,
        correlation_id: CorrelationId,
        invocation: &ToolInvocation,
    ) -> Result<String, DispatchError> {
        self.events.publish(
            EventKind::ToolCallStarted { tool: invocation.tool.clone() },
            Some(correlation_id),
            None,
        );

        let result = self.dispatch_inner(correlation_id, invocation).await;

        self.events.publish(
            EventKind::ToolCallFinished { tool: invocation.tool.clone(), ok: result.is_ok() },
            Some(correlation_id),
            None,
        );

        result
    }

    async fn dispatch_inner(
        &self,
        correlation_id: CorrelationId,
        invocation: &ToolInvocation,
    ) -> Result<String, DispatchError> {
        if let Some(peer) = peer_name_from_tool(&invocation.tool) {
            return self.dispatch_peer_call(correlation_id, peer, invocation).await;
        }

        if let Some(tool) = self.external_tools.iter().find(|t| t.name == invocation.tool) {
            let started = Instant::now();
            let value =
                self.client.invoke_tool(&tool.endpoint, &invocation.tool, invocation.parameters.clone()).await?;
            self.metrics.record_peer_call_latency(started.elapsed().as_millis() as u64);
            return Ok(value.to_string());
        }

        Err(DispatchError::UnknownTool(invocation.tool.clone()))
    }

    async fn dispatch_peer_call(
        &self,
        correlation_id: CorrelationId,
        peer: &str,
        invocation: &ToolInvocation,
    ) -> Result<String, DispatchError> {
        let snapshot = self.routing.snapshot();
        let Some(endpoint) = snapshot.get(peer) else {
            return Err(DispatchError::UnknownTool(invocation.tool.clone()));
        };

        let message = invocation
            .parameters
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let started = Instant::now();
        let reply = self
            .client
            .receive_message(endpoint, self.self_name.as_str(), &message, &correlation_id.to_string())
            .await?;
        self.metrics.record_peer_call_latency(started.elapsed().as_millis() as u64);
        self.metrics.record_message_sent(peer);

        self.events.publish(
            EventKind::PeerMessageSent { to: peer.to_string() },
            Some(correlation_id),
            Some(peer.to_string()),
        );

        Ok(reply)
    }
}
