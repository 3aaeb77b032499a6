// SPDX-License-Identifier: MIT

//! Agent name: the identity that keys the registry, the routing table and
//! the control-socket path.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A validated, non-empty, filesystem-safe agent name.
///
/// Filesystem-safe means: ASCII letters, digits, `-` and `_` only. This keeps
/// `agent-<name>.sock` a predictable, unambiguous path on every platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentName(String);

/// Error returned when a candidate name fails validation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InvalidAgentName {
    #[error("agent name must not be empty")]
    Empty,
    #[error("agent name {0:?} contains characters other than [A-Za-z0-9_-]")]
    NotFilesystemSafe(String),
}

impl AgentName {
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidAgentName> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidAgentName::Empty);
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(InvalidAgentName::NotFilesystemSafe(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AgentName {
    type Error = InvalidAgentName;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AgentName> for String {
    fn from(value: AgentName) -> Self {
        value.0
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for AgentName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for AgentName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
