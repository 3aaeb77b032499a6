// SPDX-License-Identifier: MIT

//! Scripted provider for tests: returns canned responses in sequence rather
//! than calling out to any real model.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{ModelProvider, ModelRequest, ModelResponse, ProviderError};

/// One scripted step: either a canned reply or a canned failure, so a test
/// can exercise retry/error handling the same way it exercises tool calls.
#[derive(Clone)]
pub enum MockStep {
    Response(ModelResponse),
    Error(ProviderError),
}

/// A provider whose responses are fixed in advance. The last step in the
/// script repeats once exhausted, so a test doesn't have to predict the
/// exact number of reasoning-loop iterations.
pub struct MockProvider {
    native_tool_calls: bool,
    script: Mutex<Vec<MockStep>>,
    cursor: Mutex<usize>,
    requests_seen: Mutex<Vec<ModelRequest>>,
}

impl MockProvider {
    pub fn new(native_tool_calls: bool, script: Vec<ModelResponse>) -> Self {
        Self::scripted(native_tool_calls, script.into_iter().map(MockStep::Response).collect())
    }

    /// Like [`MockProvider::new`] but lets a step fail instead of reply, for
    /// scripting retry exhaustion or per-agent conversations driven entirely
    /// from a descriptor/env without a real model behind it.
    pub fn scripted(native_tool_calls: bool, script: Vec<MockStep>) -> Self {
        Self {
            native_tool_calls,
            script: Mutex::new(script),
            cursor: Mutex::new(0),
            requests_seen: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, for asserting on what the reasoning loop
    /// sent (e.g. that the peer catalogue was rendered into the system
    /// preamble).
    pub fn requests_seen(&self) -> Vec<ModelRequest> {
        self.requests_seen.lock().clone()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn supports_native_tool_calls(&self) -> bool {
        self.native_tool_calls
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        self.requests_seen.lock().push(request);
        let script = self.script.lock();
        if script.is_empty() {
            return Err(ProviderError::Protocol("mock provider script is empty".into()));
        }
        let mut cursor = self.cursor.lock();
        let idx = (*cursor).min(script.len() - 1);
        *cursor += 1;
        match &script[idx] {
            MockStep::Response(resp) => Ok(resp.clone()),
            MockStep::Error(err) => Err(err.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolInvocation;

    #[tokio::test]
    async fn replays_script_in_order_then_repeats_last() {
        let provider = MockProvider::new(
            true,
            vec![
                ModelResponse {
                    text: "".into(),
                    tool_calls: vec![ToolInvocation {
                        tool: "communicate_with_bob".into(),
                        parameters: serde_json::json!({"message": "hi"}),
                    }],
                },
                ModelResponse { text: "done".into(), tool_calls: vec![] },
            ],
        );

        let req = ModelRequest { system: "s".into(), turns: vec![], tools: vec![] };
        let first = provider.complete(req.clone()).await.unwrap();
        assert_eq!(first.tool_calls.len(), 1);
        let second = provider.complete(req.clone()).await.unwrap();
        assert_eq!(second.text, "done");
        let third = provider.complete(req).await.unwrap();
        assert_eq!(third.text, "done");
        assert_eq!(provider.requests_seen().len(), 3);
    }

    #[tokio::test]
    async fn a_scripted_error_step_is_returned_as_a_provider_error() {
        let provider =
            MockProvider::scripted(true, vec![MockStep::Error(ProviderError::Timeout)]);
        let req = ModelRequest { system: "s".into(), turns: vec![], tools: vec![] };
        assert!(matches!(provider.complete(req).await, Err(ProviderError::Timeout)));
    }
}
