// SPDX-License-Identifier: MIT

//! Tool-call tag protocol for models without native function calling
//! (spec §4.3).

use crate::ToolInvocation;

const OPEN_TAG: &str = "<tool_use>";
const CLOSE_TAG: &str = "</tool_use>";

/// The instruction block appended to the system preamble when the active
/// provider lacks native function calling. Documents the exact tagged form
/// `extract_tagged_tool_calls` parses.
pub fn tool_use_instructions() -> &'static str {
    "To call a tool, emit a block of the exact form:\n\
     <tool_use>{\"tool\":\"<name>\",\"parameters\":{...}}</tool_use>\n\
     You may emit more than one such block in a single reply; each is \
     dispatched in the order it appears. Text outside these blocks is shown \
     to the user as-is."
}

/// Extract every `<tool_use>{...}</tool_use>` block from `text`, in order,
/// and return the text with those blocks removed alongside the parsed
/// invocations. A block whose JSON body fails to parse is dropped silently
/// from the invocation list but still stripped from the visible text —
/// the model's intent to call a tool is clear even if it malformed the
/// arguments, and surfacing raw tag soup to the user would be worse than
/// silently treating it as a no-op (the reasoning loop simply sees no tool
/// calls that turn and returns the cleaned text, spec §4.3/§7).
pub fn extract_tagged_tool_calls(text: &str) -> (String, Vec<ToolInvocation>) {
    let mut calls = Vec::new();
    let mut visible = String::with_capacity(text.len());
    let mut rest = text;

    loop {
        let Some(open_at) = rest.find(OPEN_TAG) else {
            visible.push_str(rest);
            break;
        };
        let Some(close_rel) = rest[open_at..].find(CLOSE_TAG) else {
            // Unterminated tag: treat the rest as plain text rather than
            // hang waiting for a close tag that will never arrive.
            visible.push_str(rest);
            break;
        };
        visible.push_str(&rest[..open_at]);
        let body_start = open_at + OPEN_TAG.len();
        let body_end = open_at + close_rel;
        let body = &rest[body_start..body_end];

        if let Ok(invocation) = serde_json::from_str::<ToolInvocation>(body) {
            calls.push(invocation);
        }

        rest = &rest[body_end + CLOSE_TAG.len()..];
    }

    (visible.trim().to_string(), calls)
}
