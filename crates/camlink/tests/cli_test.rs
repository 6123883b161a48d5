//! Integration tests for the `camlink` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions,
//! config handling and error exit codes, all without a camera.
#![allow(clippy::unwrap_used)]

use std::net::TcpListener;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `camlink` binary with env isolation.
///
/// Clears all `CAMLINK_*` env vars and points config and data directories
/// at `home` so tests never touch the user's real configuration.
fn camlink_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("camlink");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("RUST_LOG")
        .env_remove("CAMLINK_IP")
        .env_remove("CAMLINK_PORT")
        .env_remove("CAMLINK_OUTPUT")
        .env_remove("CAMLINK_INSECURE")
        .env_remove("CAMLINK_TIMEOUT")
        .env_remove("CAMLINK_DISCOVER_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// A localhost port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = camlink_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    camlink_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("discover")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("settings"))
            .and(predicate::str::contains("shoot"))
            .and(predicate::str::contains("datetime")),
    );
}

#[test]
fn test_watch_help_offers_event_polling() {
    let home = tempfile::tempdir().unwrap();
    camlink_cmd(home.path())
        .args(["watch", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--events").and(predicate::str::contains("--duration")));
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    camlink_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("camlink"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    camlink_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    camlink_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_without_file_renders_defaults() {
    let home = tempfile::tempdir().unwrap();
    camlink_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[controller]")
                .and(predicate::str::contains("request_timeout_secs = 5")),
        );
}

#[test]
fn test_config_set_persists_value() {
    let home = tempfile::tempdir().unwrap();
    camlink_cmd(home.path())
        .args(["config", "set", "controller.request_timeout_secs", "9"])
        .assert()
        .success();

    camlink_cmd(home.path())
        .args(["--output", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"request_timeout_secs\": 9"));
}

#[test]
fn test_config_set_unknown_key_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = camlink_cmd(home.path())
        .args(["config", "set", "controller.bogus", "1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("bogus"));
}

#[test]
fn test_config_path_points_into_config_home() {
    let home = tempfile::tempdir().unwrap();
    camlink_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = camlink_cmd(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    let output = camlink_cmd(home.path())
        .args(["--output", "invalid", "info"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_malformed_interface_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = camlink_cmd(home.path())
        .args(["--interface", "wlan0", "discover", "--wait", "0"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("NAME=IPV4"));
}

#[test]
fn test_unreachable_camera_exits_with_connection_code() {
    let home = tempfile::tempdir().unwrap();
    let port = closed_port().to_string();
    let output = camlink_cmd(home.path())
        .args(["--ip", "127.0.0.1", "--port", &port, "--timeout", "2", "info"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("Could not connect"));
}
