//! Integration tests for the `unifw` CLI binary.
//!
//! Parsing, help, completions, and error exits run without a controller;
//! the end-to-end cases talk to a wiremock controller.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const CONFIG_PATH: &str = "/tmp/unifw-cli-test-nonexistent/config.toml";

/// Build a [`Command`] for the `unifw` binary with env isolation.
///
/// Clears all `UNIFW_*` env vars and points the config file at a
/// nonexistent path so tests never touch the user's real configuration.
fn unifw_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("unifw");
    cmd.env("UNIFW_CONFIG", CONFIG_PATH)
        .env("NO_COLOR", "1")
        .env_remove("UNIFW_PROFILE")
        .env_remove("UNIFW_CONTROLLER")
        .env_remove("UNIFW_SITE")
        .env_remove("UNIFW_PLATFORM")
        .env_remove("UNIFW_OUTPUT")
        .env_remove("UNIFW_COLOR")
        .env_remove("UNIFW_INSECURE")
        .env_remove("UNIFW_TIMEOUT")
        .env_remove("UNIFW_USERNAME")
        .env_remove("UNIFW_PASSWORD");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// A classic controller that accepts `admin` and serves two rules.
async fn controller() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "unifises=sess-1; Path=/; Max-Age=3600")
                .insert_header("X-CSRF-Token", "csrf-1")
                .set_body_json(json!({ "meta": { "rc": "ok" }, "data": [] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/rest/firewallrule"))
        .and(header("cookie", "unifises=sess-1"))
        .and(header("x-csrf-token", "csrf-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "rc": "ok" },
            "data": [
                { "_id": "r2", "name": "Block IoT", "ruleset": "LAN_IN", "rule_index": 2002,
                  "action": "drop", "enabled": true, "protocol": "all" },
                { "_id": "r1", "name": "Allow DNS", "ruleset": "LAN_IN", "rule_index": 2001,
                  "action": "accept", "enabled": true, "protocol": "udp", "dst_port": "53" },
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "meta": { "rc": "ok" }, "data": [] })),
        )
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn connected_cmd(server: &MockServer) -> assert_cmd::Command {
    let mut cmd = unifw_cmd();
    cmd.env("UNIFW_PASSWORD", "hunter2").args([
        "--controller",
        &server.uri(),
        "--platform",
        "classic",
        "-u",
        "admin",
    ]);
    cmd
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = unifw_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    unifw_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("firewall")
            .and(predicate::str::contains("rules"))
            .and(predicate::str::contains("groups"))
            .and(predicate::str::contains("session")),
    );
}

#[test]
fn test_version_flag() {
    unifw_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("unifw"));
}

#[test]
fn test_rules_create_help_lists_rulesets() {
    unifw_cmd()
        .args(["rules", "create", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wan-in").and(predicate::str::contains("lanv6-in")));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    unifw_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    unifw_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_fish() {
    unifw_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_env() {
    unifw_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(CONFIG_PATH));
}

#[test]
fn test_config_show_without_file() {
    unifw_cmd()
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"default_profile\": \"default\""));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = unifw_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_rules_list_no_controller() {
    unifw_cmd()
        .args(["rules", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No controller configured"));
}

#[test]
fn test_unknown_profile() {
    unifw_cmd()
        .args(["-p", "office", "groups", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Profile 'office' not found"));
}

#[test]
fn test_negative_timeout_rejected() {
    unifw_cmd()
        .args([
            "--controller",
            "https://127.0.0.1:1",
            "--timeout",
            "-5",
            "rules",
            "list",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("timeout"));
}

#[test]
fn test_create_requires_fields() {
    let output = unifw_cmd()
        .args(["rules", "create", "--name", "x"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--ruleset"));
}

// ── Against a mock controller ───────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_rules_list_json() {
    let server = controller().await;

    let output = connected_cmd(&server)
        .args(["rules", "list", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let rules: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<_> = rules
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(names, ["Allow DNS", "Block IoT"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rules_list_plain_ids() {
    let server = controller().await;

    connected_cmd(&server)
        .args(["rules", "list", "-o", "plain"])
        .assert()
        .success()
        .stdout("r1\nr2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_without_yes_is_refused() {
    let server = controller().await;

    connected_cmd(&server)
        .args(["rules", "delete", "r1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires confirmation"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bad_password_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "meta": { "rc": "error", "msg": "api.err.Invalid" },
            "data": []
        })))
        .mount(&server)
        .await;

    connected_cmd(&server)
        .args(["session", "check"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Authentication failed"));
}
