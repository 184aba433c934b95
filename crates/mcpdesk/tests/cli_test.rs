//! Integration tests for the `mcpdesk` CLI binary.
//!
//! Argument parsing, help output and completions run without a backend;
//! command round trips run against a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `mcpdesk` binary with env isolation.
///
/// Clears all `MCPDESK_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn mcpdesk_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("mcpdesk");
    cmd.env("HOME", "/tmp/mcpdesk-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/mcpdesk-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("MCPDESK_API_BASE_URL")
        .env_remove("MCPDESK_API_TOKEN")
        .env_remove("MCPDESK_OUTPUT")
        .env_remove("MCPDESK_TIMEOUT")
        .env_remove("MCPDESK_TIMEOUT_SECS")
        .env_remove("RUST_LOG");
    cmd
}

/// Command pointed at a mock backend.
fn against(server: &MockServer) -> assert_cmd::Command {
    let mut cmd = mcpdesk_cmd();
    cmd.arg("--base-url").arg(format!("{}/api", server.uri()));
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = mcpdesk_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_command_groups() {
    mcpdesk_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("chat")
            .and(predicate::str::contains("markets"))
            .and(predicate::str::contains("tools"))
            .and(predicate::str::contains("probe")),
    );
}

#[test]
fn test_invalid_output_format_is_usage_error() {
    mcpdesk_cmd()
        .args(["--output", "xml", "tools", "list"])
        .assert()
        .code(2);
}

#[test]
fn test_completions_bash() {
    mcpdesk_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mcpdesk"));
}

#[test]
fn test_config_path_points_at_toml() {
    mcpdesk_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_never_prints_token() {
    mcpdesk_cmd()
        .args(["--api-token", "sup3r-secret", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("http://localhost:9898/api")
                .and(predicate::str::contains("command-line flag"))
                .and(predicate::str::contains("sup3r-secret").not()),
        );
}

// ── Backend round trips ─────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_send_prints_answer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ai/generate"))
        .and(query_param("message", "hi there"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello!"))
        .mount(&server)
        .await;

    against(&server)
        .args(["chat", "send", "hi there"])
        .assert()
        .success()
        .stdout("Hello!\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_stream_prints_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ai/generateStream"))
        .and(query_param("sessionId", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data: Hel\n\ndata: lo\n\nevent: done\ndata:\n\n",
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    against(&server)
        .args(["chat", "stream", "hi", "--session", "s1"])
        .assert()
        .success()
        .stdout("Hello\n")
        .stderr(predicate::str::contains("session: s1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_stream_json_collects_answer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ai/generateStream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data: a\n\ndata: b\n\nevent: done\n\n",
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let output = against(&server)
        .args(["-o", "json-compact", "chat", "stream", "q", "--no-session"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value, json!({ "response": "ab" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_stream_failure_reports_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ai/generateStream"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "overloaded" })))
        .mount(&server)
        .await;

    let output = against(&server)
        .args(["chat", "stream", "q", "--no-session"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("overloaded"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tools_list_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/mcp/tools"))
        .and(query_param("status", "ENABLED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{ "id": 1, "name": "fs", "type": "LOCAL", "status": "ENABLED" }],
            "total": 1
        })))
        .mount(&server)
        .await;

    let output = against(&server)
        .args(["-o", "json", "tools", "list", "--status", "enabled"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["name"], "fs");
    assert_eq!(value[0]["type"], "LOCAL");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tools_list_plain_prints_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/mcp/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                { "id": 4, "name": "fs", "type": "LOCAL" },
                { "id": 7, "name": "web", "type": "REMOTE" }
            ]
        })))
        .mount(&server)
        .await;

    against(&server)
        .args(["-o", "plain", "tools", "list"])
        .assert()
        .success()
        .stdout("4\n7\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_envelope_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/mcp/markets/2/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false, "message": "market unreachable"
        })))
        .mount(&server)
        .await;

    let output = against(&server)
        .args(["markets", "refresh", "2"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
    assert!(combined_output(&output).contains("market unreachable"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_tool_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/mcp/tools/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false, "message": "tool 99 not found"
        })))
        .mount(&server)
        .await;

    let output = against(&server)
        .args(["tools", "get", "99"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("tool 99 not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_api_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ai/history"))
        .and(wiremock::matchers::bearer_token("tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    against(&server)
        .args(["--api-token", "tok", "chat", "history", "abc"])
        .assert()
        .success();
}

// ── Failure modes without a backend ─────────────────────────────────

#[test]
fn test_connection_refused_exit_code() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let output = mcpdesk_cmd()
        .args(["--base-url", &format!("http://127.0.0.1:{port}/api")])
        .args(["tools", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}

#[test]
fn test_delete_requires_yes_when_not_interactive() {
    let output = mcpdesk_cmd()
        .args(["--base-url", "http://127.0.0.1:9/api", "markets", "delete", "3"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

#[test]
fn test_invalid_base_url_is_reported() {
    let output = mcpdesk_cmd()
        .args(["--base-url", "not a url", "tools", "list"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("base_url"));
}
