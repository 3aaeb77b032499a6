// SPDX-License-Identifier: MIT

//! Derives the model-facing tool catalogue from the current routing-table
//! snapshot plus the descriptor's external tool endpoints (spec §4.3, §9:
//! "avoid any pattern requiring re-registering operations with a static
//! registry" — the catalogue is recomputed fresh every turn instead of
//! being maintained incrementally).

use oa_core::descriptor::ToolEndpoint;
use oa_core::routing::PeerSnapshot;
use oa_provider::ToolSpec;

/// Tool name a peer named `peer` is addressed by.
pub fn peer_tool_name(peer: &str) -> String {
    format!("communicate_with_{peer}")
}

/// Strip the `communicate_with_` prefix, returning the peer name if `tool`
/// matches the convention.
pub fn peer_name_from_tool(tool: &str) -> Option<&str> {
    tool.strip_prefix("communicate_with_")
}

/// Build the full tool catalogue for one reasoning-loop turn: one
/// `communicate_with_<peer>` entry per connected peer, plus the
/// descriptor's configured external tools.
pub fn build_catalogue(peers: &PeerSnapshot, external_tools: &[ToolEndpoint]) -> Vec<ToolSpec> {
    let mut tools: Vec<ToolSpec> = peers
        .keys()
        .map(|peer| ToolSpec {
            name: peer_tool_name(peer),
            description: format!("Send a message to the peer agent \"{peer}\" and wait for its reply."),
        })
        .collect();
    tools.sort_by(|a, b| a.name.cmp(&b.name));

    for t in external_tools {
        tools.push(ToolSpec {
            name: t.name.clone(),
            description: t.description.clone(),
        });
    }

    tools
}
