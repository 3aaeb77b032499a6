//! Shared scaffolding for the end-to-end specs: an isolated runtime
//! directory per test plus thin wrappers around the `oa`/`oa-agent`
//! binaries (spec §6).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use assert_cmd::Command;

/// One test's isolated `OA_RUNTIME_DIR`. Every socket, registry file and
/// descriptor this test touches lives under `dir`, so concurrent tests
/// never collide (spec §5: sockets/registry are namespaced per runtime dir).
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().expect("tempdir") }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a `[[agent]]` descriptor file and return its path.
    pub fn descriptor(&self, file_name: &str, toml_body: &str) -> PathBuf {
        let path = self.dir.path().join(file_name);
        std::fs::write(&path, toml_body).expect("write descriptor file");
        path
    }

    /// A fresh `oa` invocation with `OA_RUNTIME_DIR`/`OA_AGENT_BINARY` pinned
    /// to this project.
    pub fn oa(&self) -> Command {
        let mut cmd = Command::cargo_bin("oa").expect("oa binary");
        cmd.env("OA_RUNTIME_DIR", self.dir.path());
        cmd.env("OA_AGENT_BINARY", oa_agent_binary());
        cmd
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn control_socket(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("agent-{name}.sock"))
    }
}

pub fn oa_agent_binary() -> PathBuf {
    assert_cmd::cargo::cargo_bin("oa-agent")
}

/// Poll `check` every 50ms until it returns true or `max_ms` elapses.
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return check();
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

pub const SPEC_WAIT_MAX_MS: u64 = 5_000;

/// Minimal fluent assertions over a finished `oa` invocation, in the
/// teacher's `.passes()`/`.fails()` style, without pulling in `predicates`.
pub struct Finished {
    pub status_ok: bool,
    pub stdout: String,
    pub stderr: String,
}

pub trait RunExt {
    fn finish(self) -> Finished;
}

impl RunExt for &mut Command {
    fn finish(self) -> Finished {
        let output = self.output().expect("spawn oa");
        Finished {
            status_ok: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Connect directly to an agent's control socket and collect events from a
/// `subscribe_events` call until `wanted` have arrived or `max_ms` elapses
/// (spec §4.2 `subscribe_events`, §8 scenario 5).
pub async fn subscribe_events(
    socket_path: &Path,
    since_seq: Option<u64>,
    wanted: usize,
    max_ms: u64,
) -> Vec<oa_core::event::EventRecord> {
    use oa_wire::{read_response, write_request, Request, ResponseFrame};
    use tokio::net::UnixStream;

    let stream = UnixStream::connect(socket_path).await.expect("connect to control socket");
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = tokio::io::BufReader::new(read_half);
    let timeout = Duration::from_millis(max_ms);

    write_request(&mut write_half, &Request::SubscribeEvents { since_seq }, timeout).await.expect("send subscribe");

    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + timeout;
    while events.len() < wanted {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, read_response(&mut reader, timeout)).await {
            Ok(Ok(ResponseFrame::Event(event))) => events.push(event),
            Ok(Ok(ResponseFrame::Final(_))) | Ok(Err(_)) | Err(_) => break,
        }
    }
    events
}

impl Finished {
    pub fn passes(self) -> Self {
        assert!(self.status_ok, "expected success, stderr:\n{}", self.stderr);
        self
    }

    pub fn fails(self) -> Self {
        assert!(!self.status_ok, "expected failure, stdout:\n{}", self.stdout);
        self
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout missing {needle:?}:\n{}", self.stdout);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr missing {needle:?}:\n{}", self.stderr);
        self
    }
}
