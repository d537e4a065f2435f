//! Integration tests for the `notifly` CLI binary.
//!
//! Parsing and error-path tests run without a console; history commands
//! run against a wiremock server passed via `--api-url`.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `notifly` binary with env isolation.
///
/// Clears all `NOTIFLY_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn notifly_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("notifly");
    cmd.env("HOME", "/tmp/notifly-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/notifly-cli-test-nonexistent")
        .env_remove("NOTIFLY_PROFILE")
        .env_remove("NOTIFLY_API_URL")
        .env_remove("NOTIFLY_WS_URL")
        .env_remove("NOTIFLY_TOKEN")
        .env_remove("NOTIFLY_OUTPUT")
        .env_remove("NO_COLOR")
        .env_remove("RUST_LOG");
    cmd
}

/// `notifly_cmd` pointed at a mock console, followed by `args`.
fn console_cmd(server: &MockServer, args: &[&str]) -> assert_cmd::Command {
    let mut cmd = notifly_cmd();
    cmd.args([
        "--api-url",
        &format!("{}/api/", server.uri()),
        "--token",
        "test-token",
        "--color",
        "never",
    ])
    .args(args);
    cmd
}

/// Run a command off the async runtime so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn record(id: u64, kind: &str, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "notification_type": kind,
        "title": title,
        "message": "details",
        "data": {},
        "created_at": "2026-10-01T12:00:00Z",
        "is_read": false
    })
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = notifly_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    notifly_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("notifications")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("list"))
            .and(predicate::str::contains("clear-all")),
    );
}

#[test]
fn test_version_flag() {
    notifly_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("notifly"));
}

#[test]
fn test_invalid_subcommand() {
    notifly_cmd()
        .arg("frobnicate")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_mark_read_requires_ids() {
    notifly_cmd().arg("mark-read").assert().failure().code(2);
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_config_path_prints_location() {
    notifly_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_list_without_config_fails() {
    let output = notifly_cmd().arg("list").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(
        text.contains("Configuration file not found"),
        "Expected missing-config error:\n{text}"
    );
}

#[test]
fn test_missing_token_is_auth_error() {
    notifly_cmd()
        .args(["--api-url", "http://127.0.0.1:9/api/", "unread-count"])
        .assert()
        .failure()
        .code(3);
}

// ── History commands ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_list_renders_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notifications/"))
        .and(query_param("page", "1"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                record(1, "critical_finding", "CVE in api"),
                record(2, "scan_complete", "Nightly scan")
            ],
            "count": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run(console_cmd(&server, &["list"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CVE in api"));
    assert!(stdout.contains("critical_finding"));
    assert!(stdout.contains("Nightly scan"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unread_count_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notifications/unread-count/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unread_count": 7})))
        .mount(&server)
        .await;

    let output = run(console_cmd(&server, &["-o", "json-compact", "unread-count"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        r#"{"unread_count":7}"#
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clear_all_without_yes_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let output = run(console_cmd(&server, &["clear-all"])).await;
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("--yes"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clear_all_with_yes_deletes() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/notifications/clear-all/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let output = run(console_cmd(&server, &["-y", "clear-all"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_missing_exits_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notifications/99/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let output = run(console_cmd(&server, &["get", "99"])).await;
    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mark_read_sends_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/notifications/mark-read/"))
        .and(body_json(json!({"notification_ids": [3, 5, 8]})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let output = run(console_cmd(&server, &["mark-read", "3", "5", "8"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
}
