//! Scenario 4 (spec §8), cooperative half: `stop` against a well-behaved
//! agent removes its control-socket file within the graceful budget. The
//! non-cooperative terminate/kill escalation itself is exercised directly
//! against `oa_supervisor::process::shutdown` (see that crate's unit tests),
//! since the real `oa-agent` binary always honors a `shutdown` request.

use crate::helpers::{Project, RunExt, SPEC_WAIT_MAX_MS};

fn descriptor_toml(port: u16) -> String {
    format!(
        r#"
        [[agent]]
        name = "alice"
        port = {port}
        provider = "mock"
        model = "mock-1"
        role = "helpful assistant"
        "#
    )
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

#[test]
fn stop_removes_the_control_socket_file() {
    let project = Project::new();
    let descriptor_path = project.descriptor("agents.toml", &descriptor_toml(free_port()));

    project.oa().args(["start"]).arg(&descriptor_path).finish().passes();
    assert!(project.control_socket("alice").exists(), "socket should exist once running");

    project.oa().args(["stop", "alice"]).finish().passes();

    let gone = crate::helpers::wait_for(SPEC_WAIT_MAX_MS, || !project.control_socket("alice").exists());
    assert!(gone, "control socket file must be removed after a graceful stop");
}
