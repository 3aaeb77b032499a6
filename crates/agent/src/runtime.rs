// SPDX-License-Identifier: MIT

//! Ties one agent's routing table, conversations, event bus, metrics and
//! reasoning loop together into the object shared by the control-socket and
//! peer-transport listeners (spec §3, §4).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use oa_core::clock::{Clock, SystemClock};
use oa_core::descriptor::AgentDescriptor;
use oa_core::event::EventKind;
use oa_core::metrics::MetricsSnapshot;
use oa_core::routing::RoutingTable;
use oa_provider::ModelProvider;

use crate::conversations::ConversationManager;
use crate::env;
use crate::event_bus::EventBus;
use crate::live_metrics::LiveMetrics;
use crate::peer_client::PeerClient;
use crate::reasoning::ReasoningLoop;
use crate::tool_dispatch::ToolDispatcher;

pub struct AgentRuntime {
    descriptor: AgentDescriptor,
    routing: Arc<RoutingTable>,
    conversations: Arc<ConversationManager>,
    events: Arc<EventBus<SystemClock>>,
    metrics: Arc<LiveMetrics>,
    reasoning: Arc<ReasoningLoop<SystemClock>>,
    clock: SystemClock,
    started_at: std::time::Instant,
    ready: AtomicBool,
}

impl AgentRuntime {
    pub fn new(descriptor: AgentDescriptor, provider: Arc<dyn ModelProvider>) -> Self {
        let clock = SystemClock;
        let routing = Arc::new(RoutingTable::new(descriptor.name.clone()));
        let conversations = Arc::new(ConversationManager::new());
        let events =
            Arc::new(EventBus::new(clock.clone(), env::event_ring_capacity(), env::subscriber_queue_capacity()));
        let metrics = Arc::new(LiveMetrics::new(clock.epoch_ms()));
        let dispatcher = Arc::new(ToolDispatcher::new(
            descriptor.name.clone(),
            Arc::clone(&routing),
            descriptor.tools.clone(),
            PeerClient::new(),
            Arc::clone(&events),
            Arc::clone(&metrics),
        ));
        let reasoning = Arc::new(ReasoningLoop::new(
            descriptor.role.clone(),
            Arc::clone(&routing),
            descriptor.tools.clone(),
            Arc::clone(&conversations),
            Arc::clone(&events),
            Arc::clone(&metrics),
            provider,
            dispatcher,
            env::turn_iteration_cap(),
            env::model_retry_limit(),
        ));

        Self {
            descriptor,
            routing,
            conversations,
            events,
            metrics,
            reasoning,
            clock,
            started_at: std::time::Instant::now(),
            ready: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        self.descriptor.name.as_str()
    }

    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    pub fn peer_port(&self) -> u16 {
        self.descriptor.port
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn conversations(&self) -> &ConversationManager {
        &self.conversations
    }

    pub fn events(&self) -> &EventBus<SystemClock> {
        &self.events
    }

    pub fn reasoning(&self) -> &ReasoningLoop<SystemClock> {
        &self.reasoning
    }

    pub fn uptime_s(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot(&self.routing, &self.clock)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn record_connect_event(&self, peer: &str) {
        self.events.publish(EventKind::Connected { peer: peer.to_string() }, None, Some(peer.to_string()));
    }

    pub fn record_disconnect_event(&self, peer: &str) {
        self.events.publish(EventKind::Disconnected { peer: peer.to_string() }, None, Some(peer.to_string()));
    }
}
