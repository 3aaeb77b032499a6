//! Scenario 1 (spec §8), the flagship example: one agent calls a peer tool,
//! the peer replies, and the caller's reasoning loop resumes with the
//! peer's answer folded into the conversation (spec §4.3, §4.4).

use crate::helpers::{Project, RunExt};

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

fn bob_descriptor(port: u16) -> String {
    format!(
        r#"
        [[agent]]
        name = "bob"
        port = {port}
        provider = "mock"
        model = "mock-1"
        role = "a helpful peer"
        "#
    )
}

fn alice_descriptor(port: u16) -> String {
    let script = r#"[{"text": "", "tool_calls": [{"tool": "communicate_with_bob", "parameters": {"message": "what's the weather?"}}]}, {"text": "bob says it's sunny"}]"#;
    format!(
        r#"
        [[agent]]
        name = "alice"
        port = {port}
        provider = "mock"
        model = "mock-1"
        role = "delegates weather questions to bob"
        mock_script = '''{script}'''
        "#
    )
}

#[test]
fn alice_calls_bob_through_a_tool_and_resumes_with_the_reply() {
    let project = Project::new();

    let bob_path = project.descriptor("bob.toml", &bob_descriptor(free_port()));
    let alice_path = project.descriptor("alice.toml", &alice_descriptor(free_port()));

    project.oa().args(["start"]).arg(&bob_path).finish().passes();
    project.oa().args(["start"]).arg(&alice_path).finish().passes();

    project.oa().args(["connect", "alice", "bob"]).finish().passes();

    let result = project.oa().args(["chat", "alice", "-v", "ask bob about the weather"]).finish().passes();

    assert!(result.stdout.contains("calling communicate_with_bob"), "stdout: {}", result.stdout);
    assert!(result.stdout.contains("communicate_with_bob (ok)"), "stdout: {}", result.stdout);
    assert!(result.stdout.contains("bob says it's sunny"), "final reply missing: {}", result.stdout);
}
