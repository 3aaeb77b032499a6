// SPDX-License-Identifier: MIT

//! Live, mutable counters backing the `metrics` control command (spec §3,
//! §4.2). [`oa_core::metrics::MetricsSnapshot`] is the immutable, wire-ready
//! rendering of this state at a point in time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use oa_core::clock::Clock;
use oa_core::metrics::{LatencyHistogram, MetricsSnapshot};
use oa_core::routing::RoutingTable;

#[derive(Default)]
pub struct LiveMetrics {
    messages_sent_per_peer: Mutex<HashMap<String, u64>>,
    messages_received_per_peer: Mutex<HashMap<String, u64>>,
    model_calls: AtomicU64,
    model_errors: AtomicU64,
    tool_call_parse_failures: AtomicU64,
    outstanding_requests: AtomicU64,
    model_latency: Mutex<LatencyHistogram>,
    peer_call_latency: Mutex<LatencyHistogram>,
    started_at_epoch_ms: AtomicU64,
}

impl LiveMetrics {
    pub fn new(started_at_epoch_ms: u64) -> Self {
        let metrics = Self::default();
        metrics.started_at_epoch_ms.store(started_at_epoch_ms, Ordering::Relaxed);
        metrics
    }

    pub fn record_message_sent(&self, peer: &str) {
        *self.messages_sent_per_peer.lock().entry(peer.to_string()).or_insert(0) += 1;
    }

    pub fn record_message_received(&self, peer: &str) {
        *self.messages_received_per_peer.lock().entry(peer.to_string()).or_insert(0) += 1;
    }

    pub fn record_model_call(&self, latency_ms: u64, ok: bool) {
        self.model_calls.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.model_errors.fetch_add(1, Ordering::Relaxed);
        }
        self.model_latency.lock().observe(latency_ms);
    }

    pub fn record_tool_call_parse_failure(&self) {
        self.tool_call_parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_peer_call_latency(&self, latency_ms: u64) {
        self.peer_call_latency.lock().observe(latency_ms);
    }

    pub fn inc_outstanding(&self) {
        self.outstanding_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_outstanding(&self) {
        self.outstanding_requests.fetch_sub(1, Ordering::Relaxed);
    }

    /// Render an immutable snapshot, given the current routing table and a
    /// clock to compute uptime from the recorded start time.
    pub fn snapshot<C: Clock>(&self, routing: &RoutingTable, clock: &C) -> MetricsSnapshot {
        let started = self.started_at_epoch_ms.load(Ordering::Relaxed);
        let now = clock.epoch_ms();
        MetricsSnapshot {
            messages_sent_per_peer: self.messages_sent_per_peer.lock().clone(),
            messages_received_per_peer: self.messages_received_per_peer.lock().clone(),
            model_calls: self.model_calls.load(Ordering::Relaxed),
            model_errors: self.model_errors.load(Ordering::Relaxed),
            tool_call_parse_failures: self.tool_call_parse_failures.load(Ordering::Relaxed),
            uptime_s: now.saturating_sub(started) / 1000,
            peer_table_size: routing.len(),
            outstanding_requests: self.outstanding_requests.load(Ordering::Relaxed),
            model_latency: self.model_latency.lock().clone(),
            peer_call_latency: self.peer_call_latency.lock().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oa_core::clock::FakeClock;
    use oa_core::name::AgentName;

    #[test]
    fn snapshot_reflects_recorded_activity() {
        let metrics = LiveMetrics::new(1_000_000);
        metrics.record_message_sent("bob");
        metrics.record_message_sent("bob");
        metrics.record_model_call(50, true);
        metrics.record_model_call(10, false);

        let routing = RoutingTable::new(AgentName::new("alice").unwrap());
        routing.connect("bob", "http://bob:9002/mcp").unwrap();

        let clock = FakeClock::new();
        clock.set_epoch_ms(1_005_000);

        let snap = metrics.snapshot(&routing, &clock);
        assert_eq!(snap.messages_sent_per_peer["bob"], 2);
        assert_eq!(snap.model_calls, 2);
        assert_eq!(snap.model_errors, 1);
        assert_eq!(snap.peer_table_size, 1);
        assert_eq!(snap.uptime_s, 5);
    }
}
