// SPDX-License-Identifier: MIT

//! Agent-local, ephemeral conversation state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier threaded through a single conversation and all of its
/// event/tool activity. Multiplexes concurrent human and agent traffic at
/// every layer (spec §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CorrelationId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Role of one turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Peer,
    #[serde(rename = "self")]
    SelfRole,
    Tool,
}

/// One entry in a conversation's ordered turn log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Set when `role == Peer`: which peer this turn came from or went to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_name: Option<String>,
    pub correlation_id: CorrelationId,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>, correlation_id: CorrelationId) -> Self {
        Self { role, content: content.into(), peer_name: None, correlation_id }
    }

    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer_name = Some(peer.into());
        self
    }
}

/// Purely-observational state of a conversation's reasoning loop. Does not
/// gate behavior; exists so `status`/events can report what the loop is
/// doing (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Idle,
    Running,
    WaitingOnTool,
}

/// Ordered, in-memory, never-persisted sequence of turns for one external
/// caller identity (spec §3). One conversation per correlation id.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    state: Option<ConversationState>,
}

impl Conversation {
    pub fn new() -> Self {
        Self { turns: Vec::new(), state: Some(ConversationState::Idle) }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn state(&self) -> ConversationState {
        self.state.unwrap_or(ConversationState::Idle)
    }

    pub fn set_state(&mut self, state: ConversationState) {
        self.state = Some(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_preserve_append_order() {
        let cid = CorrelationId::new();
        let mut convo = Conversation::new();
        convo.append(Turn::new(Role::User, "hi", cid));
        convo.append(Turn::new(Role::SelfRole, "hello", cid));
        let contents: Vec<_> = convo.turns().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "hello"]);
    }

    #[test]
    fn new_conversation_starts_idle() {
        assert_eq!(Conversation::new().state(), ConversationState::Idle);
    }

    #[test]
    fn correlation_id_roundtrips_through_display_and_parse() {
        let cid = CorrelationId::new();
        let s = cid.to_string();
        let parsed: CorrelationId = s.parse().unwrap();
        assert_eq!(cid, parsed);
    }
}
