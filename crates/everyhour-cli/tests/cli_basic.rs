//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::Value;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_everyhour"))
        .args(args)
        .env("EVERYHOUR_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("stdout is JSON")
}

#[test]
fn test_checkin_then_state() {
    let dir = tempfile::tempdir().unwrap();
    let ack = run_json(dir.path(), &["checkin", "write", "report"]);
    assert_eq!(ack["ok"], true);

    let state = run_json(dir.path(), &["state"]);
    assert_eq!(state["ok"], true);
    assert_eq!(state["currentTask"], "write report");
    assert_eq!(state["historyCount"], 1);
    assert_eq!(state["lastEntry"]["task"], "write report");
    assert_eq!(state["lastEntry"]["unchanged"], false);
    assert_eq!(state["settings"]["intervalMinutes"], 60);
}

#[test]
fn test_same_keeps_current_task() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["checkin", "review"]);
    run_json(dir.path(), &["same"]);

    let state = run_json(dir.path(), &["state"]);
    assert_eq!(state["currentTask"], "review");
    assert_eq!(state["historyCount"], 2);
    assert_eq!(state["lastEntry"]["unchanged"], true);
    assert_eq!(state["lastEntry"]["task"], "");
}

#[test]
fn test_blank_checkin_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["checkin", "   "]);
    assert_eq!(code, 1);
    assert!(stderr.contains("same"));
}

#[test]
fn test_settings_set_clamps() {
    let dir = tempfile::tempdir().unwrap();
    let saved = run_json(dir.path(), &["settings", "set", "--interval", "9999", "--offset", "75"]);
    assert_eq!(saved["ok"], true);
    assert_eq!(saved["settings"]["intervalMinutes"], 720);
    assert_eq!(saved["settings"]["minuteOffset"], 59);

    // Only the given field changes.
    let saved = run_json(dir.path(), &["settings", "set", "--offset", "15"]);
    assert_eq!(saved["settings"]["intervalMinutes"], 720);
    assert_eq!(saved["settings"]["minuteOffset"], 15);

    let got = run_json(dir.path(), &["settings", "get"]);
    assert_eq!(got["settings"]["minuteOffset"], 15);
}

#[test]
fn test_unknown_request_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["request", r#"{"type":"foo"}"#]);
    assert_eq!(code, 1);
    let response: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(response["ok"], false);
    assert_eq!(response["error"], "Unknown message type: foo");
}

#[test]
fn test_clear_keeps_current_task() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["checkin", "deploy"]);
    run_json(dir.path(), &["clear"]);

    let state = run_json(dir.path(), &["state"]);
    assert_eq!(state["historyCount"], 0);
    assert_eq!(state["lastEntry"], Value::Null);
    assert_eq!(state["currentTask"], "deploy");
}

#[test]
fn test_log_json() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["checkin", "first"]);
    run_json(dir.path(), &["checkin", "second"]);

    let log = run_json(dir.path(), &["log", "--json", "--limit", "1"]);
    let entries = log.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["task"], "second");
}

#[test]
fn test_config_set_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["config", "set", "daemon.poll_secs", "5"]);
    assert_eq!(code, 0);
    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "daemon.poll_secs"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn test_daemon_answers_stdin_requests() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_everyhour"))
        .args(["daemon", "--exit-on-eof"])
        .env("EVERYHOUR_DATA_DIR", dir.path())
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start daemon");

    {
        let stdin = child.stdin.as_mut().unwrap();
        writeln!(stdin, r#"{{"type":"submit-checkin","task":"pairing"}}"#).unwrap();
        writeln!(stdin, "not json").unwrap();
        writeln!(stdin, r#"{{"type":"get-state"}}"#).unwrap();
    }
    drop(child.stdin.take());

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let responses: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["ok"], true);
    assert_eq!(responses[1]["ok"], false);
    assert!(responses[1]["error"].as_str().unwrap().starts_with("invalid JSON"));
    assert_eq!(responses[2]["currentTask"], "pairing");

    // First run prompts on stderr.
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Hourly check-in"));
}
