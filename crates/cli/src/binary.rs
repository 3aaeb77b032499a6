// SPDX-License-Identifier: MIT

//! Locates the `oa-agent` binary the supervisor spawns: override env var,
//! sibling of the running `oa` binary, debug build tree, then PATH.

use std::path::PathBuf;

const AGENT_BINARY_NAME: &str = "oa-agent";

pub fn find_agent_binary() -> PathBuf {
    if let Ok(path) = std::env::var("OA_AGENT_BINARY") {
        return PathBuf::from(path);
    }

    let current_exe = std::env::current_exe().ok();

    let is_debug_build = current_exe
        .as_ref()
        .and_then(|p| p.to_str())
        .map(|s| s.contains("target/debug"))
        .unwrap_or(false);

    if is_debug_build {
        if let Some(manifest_dir) = option_env!("CARGO_MANIFEST_DIR") {
            let dev_path = PathBuf::from(manifest_dir)
                .parent()
                .and_then(|p| p.parent())
                .map(|p| p.join("target/debug").join(AGENT_BINARY_NAME));
            if let Some(path) = dev_path {
                if path.exists() {
                    return path;
                }
            }
        }
    }

    if let Some(ref exe) = current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join(AGENT_BINARY_NAME);
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from(AGENT_BINARY_NAME)
}
