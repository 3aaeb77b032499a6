// SPDX-License-Identifier: MIT

//! JSON scripting format for [`MockProvider`](crate::MockProvider), so a
//! descriptor file (or the `OA_MOCK_SCRIPT` environment variable) can drive
//! a mock agent through a specific multi-step conversation — including tool
//! calls and model failures — instead of the single fixed echo response.

use serde::Deserialize;

use crate::{MockProvider, MockStep, ModelResponse, ProviderError, ToolInvocation};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ScriptedErrorKind {
    RateLimited,
    Timeout,
    Transport,
    Protocol,
}

impl From<ScriptedErrorKind> for ProviderError {
    fn from(kind: ScriptedErrorKind) -> Self {
        match kind {
            ScriptedErrorKind::RateLimited => ProviderError::RateLimited,
            ScriptedErrorKind::Timeout => ProviderError::Timeout,
            ScriptedErrorKind::Transport => ProviderError::Transport("scripted transport failure".into()),
            ScriptedErrorKind::Protocol => ProviderError::Protocol("scripted protocol failure".into()),
        }
    }
}

/// One step of a descriptor- or env-provided script. Untagged so the JSON
/// stays terse: a step is either a reply (`text` + optional `tool_calls`)
/// or a failure (`error`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ScriptedStep {
    Reply {
        #[serde(default)]
        text: String,
        #[serde(default)]
        tool_calls: Vec<ToolInvocation>,
    },
    Fail {
        error: ScriptedErrorKind,
    },
}

impl From<ScriptedStep> for MockStep {
    fn from(step: ScriptedStep) -> Self {
        match step {
            ScriptedStep::Reply { text, tool_calls } => MockStep::Response(ModelResponse { text, tool_calls }),
            ScriptedStep::Fail { error } => MockStep::Error(error.into()),
        }
    }
}

/// Parse a JSON array of scripted steps into a [`MockProvider`]. Accepts the
/// same shape whether it came from a descriptor's `mock_script` field or
/// from the `OA_MOCK_SCRIPT` environment variable.
pub fn parse_mock_script(native_tool_calls: bool, json: &str) -> Result<MockProvider, serde_json::Error> {
    let steps: Vec<ScriptedStep> = serde_json::from_str(json)?;
    Ok(MockProvider::scripted(native_tool_calls, steps.into_iter().map(MockStep::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModelProvider, ModelRequest};

    #[tokio::test]
    async fn a_reply_then_a_tool_call_then_a_timeout_all_parse_and_play_back_in_order() {
        let json = r#"[
            {"text": "hi"},
            {"text": "", "tool_calls": [{"tool": "communicate_with_bob", "parameters": {"message": "hey"}}]},
            {"error": "timeout"}
        ]"#;
        let provider = parse_mock_script(true, json).unwrap();
        let req = ModelRequest { system: "s".into(), turns: vec![], tools: vec![] };

        let first = provider.complete(req.clone()).await.unwrap();
        assert_eq!(first.text, "hi");

        let second = provider.complete(req.clone()).await.unwrap();
        assert_eq!(second.tool_calls.len(), 1);

        assert!(matches!(provider.complete(req).await, Err(ProviderError::Timeout)));
    }

    #[test]
    fn malformed_script_is_rejected() {
        assert!(parse_mock_script(true, "not json").is_err());
    }
}
