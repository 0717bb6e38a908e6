// SPDX-License-Identifier: MIT

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

/// A running svcdispatchd, killed on drop if a test left it behind.
struct DaemonGuard {
    child: Child,
}

impl DaemonGuard {
    fn start(args: &[&str]) -> Self {
        let child = Command::new(env!("CARGO_BIN_EXE_svcdispatchd"))
            .args(args)
            .env("RUST_LOG", "debug")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to start svcdispatchd");
        Self { child }
    }

    fn signal(&self, sig: Signal) {
        let pid = Pid::from_raw(self.child.id() as i32);
        signal::kill(pid, sig).expect("failed to signal svcdispatchd");
    }

    fn wait_timeout(&mut self, timeout: Duration) -> Option<ExitStatus> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Some(status);
            }
            thread::sleep(Duration::from_millis(20));
        }
        None
    }
}

impl Drop for DaemonGuard {
    fn drop(&mut self) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }
        let pid = Pid::from_raw(self.child.id() as i32);
        let _ = signal::kill(pid, Signal::SIGKILL);
        let _ = self.child.wait();
    }
}

fn wait_for_file(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn test_sigterm_stops_services_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let status = dir.path().join("daemon.status");
    let status_arg = status.to_str().unwrap();

    // long intervals: a prompt exit proves the pauses were interrupted
    let mut daemon = DaemonGuard::start(&[
        "--service",
        "heartbeat",
        "--service",
        "status-file",
        "--status-file",
        status_arg,
        "--interval-ms",
        "10000",
    ]);

    assert!(
        wait_for_file(&status, Duration::from_secs(10)),
        "status file never appeared"
    );
    let contents = std::fs::read_to_string(&status).unwrap();
    assert!(contents.contains(&format!("pid={}", daemon.child.id())));

    daemon.signal(Signal::SIGTERM);
    let exit = daemon
        .wait_timeout(Duration::from_secs(5))
        .expect("svcdispatchd did not exit after SIGTERM");

    assert!(exit.success(), "exit status {exit:?}");
    assert!(!status.exists(), "stop hook did not remove the status file");
}

#[test]
fn test_sigint_is_a_shutdown_signal() {
    let dir = tempfile::tempdir().unwrap();
    let status = dir.path().join("sigint.status");
    let mut daemon = DaemonGuard::start(&[
        "--service",
        "status-file",
        "--status-file",
        status.to_str().unwrap(),
        "--interval-ms",
        "10000",
    ]);
    // the signal mask is in place once the first service has written
    assert!(wait_for_file(&status, Duration::from_secs(10)));

    daemon.signal(Signal::SIGINT);
    let exit = daemon
        .wait_timeout(Duration::from_secs(5))
        .expect("svcdispatchd did not exit after SIGINT");
    assert!(exit.success(), "exit status {exit:?}");
}

#[test]
fn test_run_for_exits_on_its_own() {
    let mut daemon = DaemonGuard::start(&["--run-for-ms", "200", "--interval-ms", "50"]);

    let exit = daemon
        .wait_timeout(Duration::from_secs(10))
        .expect("svcdispatchd ignored --run-for-ms");
    assert!(exit.success(), "exit status {exit:?}");
}

#[test]
fn test_config_file_services() {
    let dir = tempfile::tempdir().unwrap();
    let status = dir.path().join("from-config.status");
    let config = dir.path().join("services.json");
    std::fs::write(
        &config,
        serde_json::json!([
            {"service": "heartbeat", "interval_ms": 5000},
            {"service": "status-file", "path": status, "interval_ms": 5000}
        ])
        .to_string(),
    )
    .unwrap();

    let mut daemon = DaemonGuard::start(&["--config", config.to_str().unwrap()]);
    assert!(wait_for_file(&status, Duration::from_secs(10)));

    daemon.signal(Signal::SIGTERM);
    let exit = daemon.wait_timeout(Duration::from_secs(5)).unwrap();
    assert!(exit.success());
    assert!(!status.exists());
}

#[test]
fn test_invalid_arguments() {
    let mut daemon = DaemonGuard::start(&["--interval-ms", "0"]);
    let exit = daemon.wait_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(exit.code(), Some(2));

    let mut daemon = DaemonGuard::start(&["--config", "/nonexistent/services.json"]);
    let exit = daemon.wait_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(exit.code(), Some(1));
}
