//! Scenario 5 (spec §8): events published before a subscriber connects are
//! still delivered, replayed from the bounded ring by `since_seq`, followed
//! by whatever is published live on the same subscription (spec §4.5).

use crate::helpers::{subscribe_events, Project, RunExt};

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

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_late_subscriber_replays_history_then_keeps_receiving_live_events() {
    let project = Project::new();
    let descriptor_path = project.descriptor("agents.toml", &descriptor_toml(free_port()));

    project.oa().args(["start"]).arg(&descriptor_path).finish().passes();

    // Nobody is subscribed yet; this chat's events only land in the ring.
    project.oa().args(["chat", "alice", "hello before anyone is listening"]).finish().passes();

    let socket = project.control_socket("alice");
    let replayed = subscribe_events(&socket, Some(1), 4, 5_000).await;
    assert_eq!(
        replayed.len(),
        4,
        "expected turn_started/model_request/model_response/turn_finished to be replayed, got {replayed:?}"
    );
    assert!(matches!(replayed[0].kind, oa_core::event::EventKind::TurnStarted));
    assert!(matches!(
        replayed.last().unwrap().kind,
        oa_core::event::EventKind::TurnFinished { .. }
    ));

    // A second subscriber connects after the first chat and only wants new
    // events; run another chat on a blocking thread so the live subscriber
    // task keeps making progress concurrently, and confirm they arrive live.
    let live_socket = socket.clone();
    let live_task = tokio::spawn(async move { subscribe_events(&live_socket, None, 4, 5_000).await });
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let project = std::sync::Arc::new(project);
    let chat_project = std::sync::Arc::clone(&project);
    tokio::task::spawn_blocking(move || {
        chat_project.oa().args(["chat", "alice", "hello while someone is listening"]).finish().passes();
    })
    .await
    .expect("chat task");
    let live = live_task.await.expect("live subscriber task");
    assert_eq!(live.len(), 4, "expected the live chat's four events to stream in, got {live:?}");
}
