// SPDX-License-Identifier: MIT

//! Wire protocols for the multi-agent orchestration runtime.
//!
//! Two independent protocols live here, per spec §1/§6: the **control**
//! protocol (newline-delimited JSON request/reply, local socket, §4.2) and
//! the **peer** protocol (JSON-RPC-shaped HTTP, §4.4). They never cross.

mod control;
mod framing;
mod peer;

pub use control::{ChatResult, HealthStatus, MetricsFormat, Request, Response};
pub use framing::{read_request, read_response, write_request, write_response, FramingError, ResponseFrame};
pub use peer::{PeerError, PeerRequest, PeerResponse, StatusResult};
