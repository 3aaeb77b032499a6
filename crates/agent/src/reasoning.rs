// SPDX-License-Identifier: MIT

//! The reasoning loop: append turn, call the model, dispatch any tool calls,
//! repeat until the model stops calling tools or the iteration cap is hit
//! (spec §4.3).

use std::sync::Arc;

use thiserror::Error;
use tokio::time::sleep;

use oa_core::clock::Clock;
use oa_core::conversation::{ConversationState, CorrelationId, Role, Turn};
use oa_core::event::EventKind;
use oa_core::routing::RoutingTable;
use oa_provider::{tool_use_instructions, ModelProvider, ModelRequest, ProviderError, ToolInvocation};

use crate::capabilities::build_catalogue;
use crate::conversations::ConversationManager;
use crate::event_bus::EventBus;
use crate::live_metrics::LiveMetrics;
use crate::tool_dispatch::ToolDispatcher;

/// Holds the `outstanding_requests` gauge (spec §3) up for as long as one
/// `process_turn` call is in flight, regardless of which path it returns by.
struct OutstandingGuard<'a>(&'a LiveMetrics);

impl<'a> OutstandingGuard<'a> {
    fn new(metrics: &'a LiveMetrics) -> Self {
        metrics.inc_outstanding();
        Self(metrics)
    }
}

impl Drop for OutstandingGuard<'_> {
    fn drop(&mut self) {
        self.0.dec_outstanding();
    }
}

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("model provider error: {0}")]
    Model(#[from] ProviderError),
}

pub struct ReasoningLoop<C: Clock> {
    system_role: String,
    routing: Arc<RoutingTable>,
    external_tools: Vec<oa_core::descriptor::ToolEndpoint>,
    conversations: Arc<ConversationManager>,
    events: Arc<EventBus<C>>,
    metrics: Arc<LiveMetrics>,
    provider: Arc<dyn ModelProvider>,
    dispatcher: Arc<ToolDispatcher<C>>,
    iteration_cap: u32,
    model_retry_limit: u32,
}

impl<C: Clock> ReasoningLoop<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        system_role: String,
        routing: Arc<RoutingTable>,
        external_tools: Vec<oa_core::descriptor::ToolEndpoint>,
        conversations: Arc<ConversationManager>,
        events: Arc<EventBus<C>>,
        metrics: Arc<LiveMetrics>,
        provider: Arc<dyn ModelProvider>,
        dispatcher: Arc<ToolDispatcher<C>>,
        iteration_cap: u32,
        model_retry_limit: u32,
    ) -> Self {
        Self {
            system_role,
            routing,
            external_tools,
            conversations,
            events,
            metrics,
            provider,
            dispatcher,
            iteration_cap,
            model_retry_limit,
        }
    }

    fn system_preamble(&self) -> String {
        if self.provider.supports_native_tool_calls() {
            self.system_role.clone()
        } else {
            format!("{}\n\n{}", self.system_role, tool_use_instructions())
        }
    }

    /// Inject one turn (from a user, a peer, or the control socket) and run
    /// the loop to quiescence, returning the final assistant-visible text.
    #[tracing::instrument(name = "conversation", skip(self, content), fields(correlation_id = %correlation_id))]
    pub async fn process_turn(
        &self,
        correlation_id: CorrelationId,
        role: Role,
        content: String,
        peer_name: Option<String>,
    ) -> Result<String, ReasoningError> {
        let _outstanding = OutstandingGuard::new(&self.metrics);
        let conversation = self.conversations.get_or_create(correlation_id);
        let mut convo = conversation.lock().await;

        let mut incoming = Turn::new(role, content, correlation_id);
        if let Some(peer) = peer_name.clone() {
            incoming = incoming.with_peer(peer);
        }
        convo.append(incoming);
        convo.set_state(ConversationState::Running);

        self.events.publish(EventKind::TurnStarted, Some(correlation_id), peer_name.clone());

        let mut final_text = String::new();
        let mut capped = false;

        for iteration in 0..self.iteration_cap {
            let snapshot = self.routing.snapshot();
            let tools = build_catalogue(&snapshot, &self.external_tools);
            let request =
                ModelRequest { system: self.system_preamble(), turns: convo.turns().to_vec(), tools };

            self.events.publish(EventKind::ModelRequest, Some(correlation_id), None);
            let response = match self.call_model_with_retry(request).await {
                Ok(response) => response,
                Err(err) => {
                    convo.set_state(ConversationState::Idle);
                    self.events.publish(
                        EventKind::Error { message: err.to_string() },
                        Some(correlation_id),
                        None,
                    );
                    return Err(err);
                }
            };
            self.events.publish(
                EventKind::ModelResponse { had_tool_calls: !response.tool_calls.is_empty() },
                Some(correlation_id),
                None,
            );

            let (visible_text, mut tool_calls) = (response.text, response.tool_calls);
            let tagged = if self.provider.supports_native_tool_calls() {
                (visible_text, Vec::new())
            } else {
                oa_provider::extract_tagged_tool_calls(&visible_text)
            };
            let (visible_text, mut tagged_calls) = tagged;
            tool_calls.append(&mut tagged_calls);

            convo.append(Turn::new(Role::SelfRole, visible_text.clone(), correlation_id));
            final_text = visible_text;

            if tool_calls.is_empty() {
                break;
            }

            convo.set_state(ConversationState::WaitingOnTool);
            for invocation in &tool_calls {
                let result = self.run_tool(correlation_id, invocation).await;
                convo.append(Turn::new(Role::Tool, result, correlation_id));
            }
            convo.set_state(ConversationState::Running);

            if iteration + 1 == self.iteration_cap {
                capped = true;
            }
        }

        convo.set_state(ConversationState::Idle);

        if capped {
            self.events.publish(
                EventKind::TurnCapped { iterations: self.iteration_cap },
                Some(correlation_id),
                None,
            );
        } else {
            self.events.publish(
                EventKind::TurnFinished { response: final_text.clone() },
                Some(correlation_id),
                None,
            );
        }

        Ok(final_text)
    }

    async fn run_tool(&self, correlation_id: CorrelationId, invocation: &ToolInvocation) -> String {
        match self.dispatcher.dispatch(correlation_id, invocation).await {
            Ok(result) => result,
            Err(err) => {
                self.metrics.record_tool_call_parse_failure();
                self.events.publish(
                    EventKind::Error { message: err.to_string() },
                    Some(correlation_id),
                    None,
                );
                format!("error: {err}")
            }
        }
    }

    async fn call_model_with_retry(
        &self,
        request: ModelRequest,
    ) -> Result<oa_provider::ModelResponse, ReasoningError> {
        let started = std::time::Instant::now();
        let mut attempt = 0;
        loop {
            match self.provider.complete(request.clone()).await {
                Ok(resp) => {
                    self.metrics.record_model_call(started.elapsed().as_millis() as u64, true);
                    return Ok(resp);
                }
                Err(err) if attempt < self.model_retry_limit && is_retryable(&err) => {
                    attempt += 1;
                    sleep(std::time::Duration::from_millis(100 * attempt as u64)).await;
                }
                Err(err) => {
                    self.metrics.record_model_call(started.elapsed().as_millis() as u64, false);
                    return Err(err.into());
                }
            }
        }
    }
}

fn is_retryable(err: &ProviderError) -> bool {
    matches!(err, ProviderError::Timeout | ProviderError::RateLimited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oa_core::clock::FakeClock;
    use oa_core::name::AgentName;
    use oa_provider::{MockProvider, MockStep, ModelResponse, ProviderError};

    fn loop_with(provider: MockProvider, iteration_cap: u32) -> ReasoningLoop<FakeClock> {
        let clock = FakeClock::new();
        let routing = Arc::new(RoutingTable::new(AgentName::new("alice").unwrap()));
        let events = Arc::new(EventBus::new(clock, 100, 16));
        let metrics = Arc::new(LiveMetrics::new(0));
        let dispatcher = Arc::new(ToolDispatcher::new(
            AgentName::new("alice").unwrap(),
            Arc::clone(&routing),
            vec![],
            crate::peer_client::PeerClient::new(),
            Arc::clone(&events),
            Arc::clone(&metrics),
        ));
        ReasoningLoop::new(
            "helpful assistant".into(),
            routing,
            vec![],
            Arc::new(ConversationManager::new()),
            events,
            metrics,
            Arc::new(provider),
            dispatcher,
            iteration_cap,
            0,
        )
    }

    #[tokio::test]
    async fn turn_with_no_tool_calls_finishes_in_one_iteration() {
        let provider =
            MockProvider::new(true, vec![ModelResponse { text: "hi there".into(), tool_calls: vec![] }]);
        let reasoning = loop_with(provider, 8);
        let result =
            reasoning.process_turn(CorrelationId::new(), Role::User, "hello".into(), None).await.unwrap();
        assert_eq!(result, "hi there");
    }

    #[tokio::test]
    async fn retry_exhaustion_leaves_the_conversation_idle_and_publishes_an_error_event() {
        let clock = FakeClock::new();
        let routing = Arc::new(RoutingTable::new(AgentName::new("alice").unwrap()));
        let events = Arc::new(EventBus::new(clock, 100, 16));
        let metrics = Arc::new(LiveMetrics::new(0));
        let dispatcher = Arc::new(ToolDispatcher::new(
            AgentName::new("alice").unwrap(),
            Arc::clone(&routing),
            vec![],
            crate::peer_client::PeerClient::new(),
            Arc::clone(&events),
            Arc::clone(&metrics),
        ));
        let conversations = Arc::new(ConversationManager::new());
        let provider = MockProvider::scripted(true, vec![MockStep::Error(ProviderError::Timeout)]);
        let reasoning = ReasoningLoop::new(
            "helpful assistant".into(),
            routing,
            vec![],
            Arc::clone(&conversations),
            Arc::clone(&events),
            Arc::clone(&metrics),
            Arc::new(provider),
            dispatcher,
            8,
            0,
        );

        let correlation_id = CorrelationId::new();
        let result = reasoning.process_turn(correlation_id, Role::User, "hello".into(), None).await;
        assert!(result.is_err(), "a model error that exhausts retries must surface as Err");

        let conversation = conversations.get_or_create(correlation_id);
        let convo = conversation.lock().await;
        assert_eq!(
            convo.state(),
            ConversationState::Idle,
            "the conversation must return to idle rather than stay stuck running"
        );
        drop(convo);

        let (replay, _rx) = events.subscribe(Some(1));
        assert!(
            replay.iter().any(|e| matches!(e.kind, EventKind::Error { .. })),
            "retry exhaustion must publish an error event"
        );
    }

    #[tokio::test]
    async fn turn_capped_when_model_never_stops_calling_tools() {
        let invocation =
            ToolInvocation { tool: "communicate_with_bob".into(), parameters: serde_json::json!({"message":"hi"}) };
        let provider = MockProvider::new(
            true,
            vec![ModelResponse { text: "".into(), tool_calls: vec![invocation] }],
        );
        let reasoning = loop_with(provider, 3);
        let result =
            reasoning.process_turn(CorrelationId::new(), Role::User, "hello".into(), None).await.unwrap();
        assert_eq!(result, "");
    }
}
