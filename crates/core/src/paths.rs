// SPDX-License-Identifier: MIT

//! Filesystem locations shared by every process that needs to find another
//! agent's control socket or the supervisor's registry file without being
//! told explicitly (spec §6): the agent runtime, the supervisor, and the
//! CLI all resolve the same `runtime_dir`.

use std::path::PathBuf;

/// Runtime directory holding control sockets and the registry file:
/// `OA_RUNTIME_DIR` env var if set, else an OS-appropriate per-user temp
/// directory.
pub fn runtime_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("OA_RUNTIME_DIR") {
        return PathBuf::from(dir);
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    std::env::temp_dir().join(format!("oa-{user}"))
}

/// Control-socket path for a given agent name: `<runtime_dir>/agent-<name>.sock`.
pub fn control_socket_path(name: &str) -> PathBuf {
    runtime_dir().join(format!("agent-{name}.sock"))
}

/// Path to the supervisor's registry file.
pub fn registry_path() -> PathBuf {
    runtime_dir().join("registry.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial(oa_runtime_dir)]
    fn control_socket_path_is_namespaced_under_runtime_dir() {
        std::env::set_var("OA_RUNTIME_DIR", "/tmp/oa-test-runtime");
        assert_eq!(control_socket_path("alice"), PathBuf::from("/tmp/oa-test-runtime/agent-alice.sock"));
        std::env::remove_var("OA_RUNTIME_DIR");
    }
}
