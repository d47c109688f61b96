//! Integration tests for the `portly` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions,
//! and error handling without reaching a real switch.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `portly` binary with env isolation.
///
/// Clears all `PORTLY_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn portly_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("portly");
    cmd.env("HOME", "/tmp/portly-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/portly-cli-test-nonexistent")
        .env_remove("PORTLY_PROFILE")
        .env_remove("PORTLY_HOST")
        .env_remove("PORTLY_USERNAME")
        .env_remove("PORTLY_SSH_PORT")
        .env_remove("PORTLY_OUTPUT")
        .env_remove("PORTLY_PASSWORD");
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
    let output = portly_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    portly_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("switch")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("ports"))
            .and(predicate::str::contains("poe"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    portly_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("portly"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    portly_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    portly_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_prints_toml_location() {
    portly_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_no_config() {
    // `config show` renders the default config when no file exists.
    portly_cmd()
        .args(["--output", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"profiles\""));
}

#[test]
fn test_set_password_rejects_empty_stdin() {
    portly_cmd()
        .args(["config", "set-password", "--stdin"])
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("password"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = portly_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success(), "Expected failure for invalid subcommand");
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_ports_list_without_switch_configured() {
    portly_cmd()
        .args(["ports", "list"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("No switch configured")
                .or(predicate::str::contains("--host")),
        );
}

#[test]
fn test_port_zero_is_rejected_by_parser() {
    let output = portly_cmd().args(["ports", "get", "0"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains('0'), "Expected the bad value in output:\n{text}");
}

#[test]
fn test_unknown_profile_is_reported() {
    portly_cmd()
        .args(["--profile", "nope", "status"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_invalid_output_format() {
    let output = portly_cmd()
        .args(["--output", "invalid", "status"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_disable_without_yes_needs_a_terminal() {
    // Confirmation happens before any connection attempt.
    portly_cmd()
        .env("PORTLY_PASSWORD", "unused")
        .args(["--host", "192.0.2.1", "ports", "disable", "3"])
        .write_stdin("")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn test_mode_disabled_without_yes_needs_a_terminal() {
    portly_cmd()
        .env("PORTLY_PASSWORD", "unused")
        .args(["--host", "192.0.2.1", "ports", "mode", "3", "disabled"])
        .write_stdin("")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn test_unknown_port_mode_is_rejected_by_parser() {
    let output = portly_cmd()
        .args(["ports", "mode", "3", "turbo"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("enabled-poe-on"),
        "Expected the valid modes in output:\n{text}"
    );
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_ports_subcommands_exist() {
    portly_cmd().args(["ports", "--help"]).assert().success().stdout(
        predicate::str::contains("list")
            .and(predicate::str::contains("get"))
            .and(predicate::str::contains("enable"))
            .and(predicate::str::contains("disable"))
            .and(predicate::str::contains("mode")),
    );
}

#[test]
fn test_config_subcommands_exist() {
    portly_cmd().args(["config", "--help"]).assert().success().stdout(
        predicate::str::contains("path")
            .and(predicate::str::contains("show"))
            .and(predicate::str::contains("set-password")),
    );
}
