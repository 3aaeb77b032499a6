// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the agent runtime.

use std::path::PathBuf;
use std::time::Duration;

pub use oa_core::paths::{control_socket_path, runtime_dir};

/// Timeout for a single control-socket request/response round trip.
pub fn ipc_timeout() -> Duration {
    std::env::var("OA_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Connect timeout for outbound peer calls (spec §4.4 default 2s).
pub fn peer_connect_timeout() -> Duration {
    std::env::var("OA_PEER_CONNECT_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(2))
}

/// Request timeout for outbound peer calls (spec §4.4 default 60s).
pub fn peer_request_timeout() -> Duration {
    std::env::var("OA_PEER_REQUEST_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(60))
}

/// Per-turn model-provider retry bound (spec §4.3 default 3).
pub fn model_retry_limit() -> u32 {
    std::env::var("OA_MODEL_RETRY_LIMIT").ok().and_then(|s| s.parse().ok()).unwrap_or(3)
}

/// Per-turn reasoning-loop iteration cap (spec §4.3 default 8).
pub fn turn_iteration_cap() -> u32 {
    std::env::var("OA_TURN_ITERATION_CAP").ok().and_then(|s| s.parse().ok()).unwrap_or(8)
}

/// Bounded ring buffer size for the event bus (spec §4.5 default 1000).
pub fn event_ring_capacity() -> usize {
    std::env::var("OA_EVENT_RING_CAPACITY").ok().and_then(|s| s.parse().ok()).unwrap_or(1000)
}

/// Per-subscriber bounded event queue depth before it is dropped for
/// stalling (spec §4.5, §8 scenario 5).
pub fn subscriber_queue_capacity() -> usize {
    std::env::var("OA_SUBSCRIBER_QUEUE_CAPACITY").ok().and_then(|s| s.parse().ok()).unwrap_or(256)
}

/// Optional directory for a rolling file log appender, in addition to
/// stderr.
pub fn log_dir() -> Option<PathBuf> {
    std::env::var("OA_LOG_DIR").ok().map(PathBuf::from)
}

/// Fallback scripted mock-provider conversation, used when the descriptor
/// itself carries no `mock_script` (lets a test drive a mock agent's
/// behavior without writing it into the descriptor file).
pub fn mock_script() -> Option<String> {
    std::env::var("OA_MOCK_SCRIPT").ok()
}
