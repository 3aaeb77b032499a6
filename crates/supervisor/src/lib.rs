// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oa-supervisor: spawns, monitors and restarts agent processes, and
//! persists their state to a registry file so a fresh CLI invocation can
//! discover agents started by an earlier process (spec §1, §4.1).

pub mod client;
pub mod config;
pub mod process;
pub mod registry;
pub mod supervisor;

pub use config::{SupervisorConfig, SupervisorError};
pub use registry::Registry;
pub use supervisor::Supervisor;
