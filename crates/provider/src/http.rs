// SPDX-License-Identifier: MIT

//! Generic HTTP/JSON reference adapter. Posts `{system, transcript, tools}`
//! to a configured URL and expects `{text, tool_calls: [{tool, parameters}]}`
//! back. Concrete vendor SDKs (Anthropic, OpenAI, ...) are out of scope
//! (spec §1 non-goals) and would implement the same `ModelProvider` trait
//! without touching the agent runtime.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{render_transcript, ModelProvider, ModelRequest, ModelResponse, ProviderError, ToolInvocation, ToolSpec};

#[derive(Serialize)]
struct HttpRequestBody<'a> {
    system: &'a str,
    transcript: String,
    tools: &'a [ToolSpec],
}

#[derive(Deserialize)]
struct HttpResponseBody {
    text: String,
    #[serde(default)]
    tool_calls: Vec<ToolInvocation>,
}

/// A provider backed by a plain HTTP POST endpoint, for use with local or
/// self-hosted model servers that don't ship a Rust SDK.
pub struct HttpJsonProvider {
    client: reqwest::Client,
    endpoint: String,
    native_tool_calls: bool,
    api_key: Option<String>,
}

impl HttpJsonProvider {
    pub fn new(endpoint: impl Into<String>, native_tool_calls: bool) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .connect_timeout(Duration::from_secs(2))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            native_tool_calls,
            // Credentials never come from the descriptor file or the
            // registry (spec §6); `OA_MODEL_API_KEY` is the only source.
            api_key: std::env::var("OA_MODEL_API_KEY").ok(),
        }
    }
}

#[async_trait]
impl ModelProvider for HttpJsonProvider {
    fn supports_native_tool_calls(&self) -> bool {
        self.native_tool_calls
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let body = HttpRequestBody {
            system: &request.system,
            transcript: render_transcript(&request.turns),
            tools: &request.tools,
        };

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(ProviderError::Transport(format!("http status {}", resp.status())));
        }

        let parsed: HttpResponseBody =
            resp.json().await.map_err(|e| ProviderError::Protocol(e.to_string()))?;

        Ok(ModelResponse { text: parsed.text, tool_calls: parsed.tool_calls })
    }
}
