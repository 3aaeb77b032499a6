// SPDX-License-Identifier: MIT

//! Agent-local, derived metrics snapshot (spec §3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A simple running-average/latency histogram summary. Kept intentionally
/// small (count/sum/max) rather than full bucketed histograms, since nothing
/// downstream needs quantiles beyond "how slow is this getting."
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyHistogram {
    pub count: u64,
    pub sum_ms: u64,
    pub max_ms: u64,
}

impl LatencyHistogram {
    pub fn observe(&mut self, duration_ms: u64) {
        self.count += 1;
        self.sum_ms += duration_ms;
        self.max_ms = self.max_ms.max(duration_ms);
    }

    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_ms as f64 / self.count as f64
        }
    }
}

/// Derived snapshot of one agent's counters/gauges/histograms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub messages_sent_per_peer: HashMap<String, u64>,
    pub messages_received_per_peer: HashMap<String, u64>,
    pub model_calls: u64,
    pub model_errors: u64,
    pub tool_call_parse_failures: u64,
    pub uptime_s: u64,
    pub peer_table_size: usize,
    pub outstanding_requests: u64,
    pub model_latency: LatencyHistogram,
    pub peer_call_latency: LatencyHistogram,
}

impl MetricsSnapshot {
    /// Render as Prometheus text exposition format. Mechanical, but kept
    /// here (rather than treated purely as an external adapter) because
    /// spec §6 requires `metrics -f prometheus` to be an end-to-end testable
    /// feature of the metrics *data*, not just of some separate scrape
    /// server (SPEC_FULL §10.6).
    pub fn to_prometheus(&self, agent_name: &str) -> String {
        let mut out = String::new();
        for (peer, count) in &self.messages_sent_per_peer {
            out.push_str(&format!(
                "oa_messages_sent_total{{agent=\"{agent_name}\",peer=\"{peer}\"}} {count}\n"
            ));
        }
        for (peer, count) in &self.messages_received_per_peer {
            out.push_str(&format!(
                "oa_messages_received_total{{agent=\"{agent_name}\",peer=\"{peer}\"}} {count}\n"
            ));
        }
        out.push_str(&format!("oa_model_calls_total{{agent=\"{agent_name}\"}} {}\n", self.model_calls));
        out.push_str(&format!("oa_model_errors_total{{agent=\"{agent_name}\"}} {}\n", self.model_errors));
        out.push_str(&format!(
            "oa_tool_call_parse_failures_total{{agent=\"{agent_name}\"}} {}\n",
            self.tool_call_parse_failures
        ));
        out.push_str(&format!("oa_uptime_seconds{{agent=\"{agent_name}\"}} {}\n", self.uptime_s));
        out.push_str(&format!(
            "oa_peer_table_size{{agent=\"{agent_name}\"}} {}\n",
            self.peer_table_size
        ));
        out.push_str(&format!(
            "oa_outstanding_requests{{agent=\"{agent_name}\"}} {}\n",
            self.outstanding_requests
        ));
        out.push_str(&format!(
            "oa_model_latency_ms_mean{{agent=\"{agent_name}\"}} {}\n",
            self.model_latency.mean_ms()
        ));
        out.push_str(&format!(
            "oa_peer_call_latency_ms_mean{{agent=\"{agent_name}\"}} {}\n",
            self.peer_call_latency.mean_ms()
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_tracks_mean_and_max() {
        let mut h = LatencyHistogram::default();
        h.observe(10);
        h.observe(30);
        assert_eq!(h.count, 2);
        assert_eq!(h.max_ms, 30);
        assert_eq!(h.mean_ms(), 20.0);
    }

    #[test]
    fn prometheus_rendering_includes_agent_label() {
        let mut snap = MetricsSnapshot::default();
        snap.model_calls = 5;
        let text = snap.to_prometheus("alice");
        assert!(text.contains("oa_model_calls_total{agent=\"alice\"} 5"));
    }
}
