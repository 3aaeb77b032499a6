// SPDX-License-Identifier: MIT

//! Model provider adapter (spec §4.3's "Model provider adapter" component,
//! §1 "abstract request/response to a language model; normalizes tool-call
//! emission").
//!
//! This crate defines the trait the agent runtime programs against and the
//! non-native tool-call tag protocol; it intentionally does not implement
//! any specific vendor's wire format (spec §1 non-goals). `HttpJsonProvider`
//! is the one concrete adapter shipped here: a generic POST-JSON bridge
//! suitable for any backend that speaks the documented request/response
//! shape, and `MockProvider` is a scripted implementation for tests.

mod http;
mod mock;
mod mock_script;
mod tagged;

pub use http::HttpJsonProvider;
pub use mock::{MockProvider, MockStep};
pub use mock_script::parse_mock_script;
pub use tagged::{extract_tagged_tool_calls, tool_use_instructions};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use oa_core::conversation::{Role, Turn};

/// A single tool the model may invoke this turn, rendered into the request
/// so the model knows it exists (spec §4.3: "dynamically rendered peer
/// catalogue").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

/// A structured tool invocation extracted from a model response, whether it
/// arrived via native function calling or via the `<tool_use>` tag protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool: String,
    pub parameters: serde_json::Value,
}

/// One completion request: a system preamble, the conversation tail, and the
/// tool catalogue currently available (spec §4.3 step 3).
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub turns: Vec<Turn>,
    pub tools: Vec<ToolSpec>,
}

/// One completion response: the assistant's text (already stripped of any
/// `<tool_use>` tags) and zero or more structured tool invocations, in the
/// order the model emitted them.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub tool_calls: Vec<ToolInvocation>,
}

/// Failures from talking to the underlying model. Maps onto spec §7's
/// "Model failure" kind.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("model provider rate limited the request")]
    RateLimited,
    #[error("model provider request timed out")]
    Timeout,
    #[error("model provider transport error: {0}")]
    Transport(String),
    #[error("model provider returned an unexpected response: {0}")]
    Protocol(String),
}

/// Abstract request/response contract to a language model.
///
/// `supports_native_tool_calls` tells the agent runtime whether to use the
/// structured `tools` parameter of the underlying API (when true) or to fall
/// back to the `<tool_use>` tag protocol documented in `tagged` (when
/// false) — spec §4.3.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn supports_native_tool_calls(&self) -> bool;

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError>;
}

/// Render turns for providers as a flat transcript, used by both the tagged
/// fallback and the reference HTTP adapter. Kept here so every adapter
/// renders conversation history identically.
pub fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| {
            let role = match t.role {
                Role::System => "system",
                Role::User => "user",
                Role::Peer => t.peer_name.as_deref().unwrap_or("peer"),
                Role::SelfRole => "assistant",
                Role::Tool => "tool",
            };
            format!("[{role}] {}", t.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
