//! Scenario 2 (spec §8): starting an agent whose peer port is already bound
//! must fail within the ready deadline, leave `status` showing `failed`, and
//! leave no control-socket file behind.

use crate::helpers::{Project, RunExt};

fn descriptor_toml(port: u16) -> String {
    format!(
        r#"
        [[agent]]
        name = "alice"
        port = {port}
        provider = "mock"
        model = "mock-1"
        role = "helpful assistant"

        [supervisor]
        ready_deadline_ms = 1000
        "#
    )
}

#[test]
fn start_fails_when_the_peer_port_is_already_bound() {
    let project = Project::new();

    // Hold the port open for the whole test so the agent's peer_server::bind fails.
    let port_hog = std::net::TcpListener::bind("127.0.0.1:0").expect("bind a port to steal");
    let port = port_hog.local_addr().unwrap().port();

    let descriptor_path = project.descriptor("agents.toml", &descriptor_toml(port));

    project.oa().args(["start"]).arg(&descriptor_path).finish().fails().stderr_has("alice");

    let status = project.oa().args(["-f", "json", "status"]).finish().passes();
    assert!(status.stdout.contains("\"alice\""));
    assert!(status.stdout.contains("\"failed\""), "status: {}", status.stdout);

    assert!(!project.control_socket("alice").exists(), "a failed start must not leave a socket file behind");

    drop(port_hog);
}
