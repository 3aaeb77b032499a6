// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oa-agent: the agent runtime process (spec §1, §4.3-§4.5).
//!
//! Owns one agent's routing table, conversations, event bus and reasoning
//! loop, and exposes them over two listeners: the control socket
//! (`oa-wire::control`) for operator/supervisor commands, and the peer
//! transport HTTP server (`oa-wire::peer`) for inbound calls from other
//! agents.

pub mod capabilities;
pub mod control_server;
pub mod conversations;
pub mod env;
pub mod event_bus;
pub mod live_metrics;
pub mod logging;
pub mod peer_client;
pub mod peer_server;
pub mod reasoning;
pub mod runtime;
pub mod tool_dispatch;

pub use event_bus::EventBus;
pub use runtime::AgentRuntime;
