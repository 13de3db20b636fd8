//! Integration tests for CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn stratum() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("stratum"));
    cmd.env_clear();
    cmd
}

#[test]
fn test_cli_version() {
    let mut cmd = stratum();
    cmd.arg("--version");
    cmd.assert().success().stdout(predicate::str::contains("stratum"));
}

#[test]
fn test_cli_help() {
    let mut cmd = stratum();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Layered configuration resolution"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_serve_help_lists_flags() {
    let mut cmd = stratum();
    cmd.args(["serve", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--check"))
        .stdout(predicate::str::contains("--dump"));
}

#[test]
fn test_check_with_defaults() {
    let mut cmd = stratum();
    cmd.args(["serve", "--check"]);
    cmd.assert().success().stdout(predicate::str::is_empty());
}

#[test]
fn test_check_dump_prints_resolved_configuration() {
    let mut cmd = stratum();
    cmd.args(["serve", "--check", "--dump"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("---\n"))
        .stdout(predicate::str::contains("reporting:"))
        .stdout(predicate::str::contains("level: info"))
        .stdout(predicate::str::contains("pidfile:"));
}

#[test]
fn test_config_file_and_environment_layers() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("stratum.yaml");
    fs::write(&path, "---\nreporting:\n  level: warn\n  format: json\n").expect("write config");

    let mut cmd = stratum();
    cmd.args(["serve", "-C", "-D", "-c", path.to_str().expect("utf8 path")]);
    cmd.env("STRATUM_SERVE_REPORTING_LEVEL", "debug");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("level: debug"))
        .stdout(predicate::str::contains("format: json"));
}

#[test]
fn test_unknown_key_fails() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("stratum.yaml");
    fs::write(&path, "reporting:\n  colour: blue\n").expect("write config");

    let mut cmd = stratum();
    cmd.args(["serve", "--check", "--config", path.to_str().expect("utf8 path")]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown configuration key 'reporting.colour'"));
}

#[test]
fn test_unknown_environment_override_fails() {
    let mut cmd = stratum();
    cmd.args(["serve", "--check"]);
    cmd.env("STRATUM_SERVE_REPORTING_COLOUR", "blue");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("STRATUM_SERVE_REPORTING_COLOUR"));
}

#[test]
fn test_other_namespace_is_ignored() {
    let mut cmd = stratum();
    cmd.args(["serve", "--check", "--dump"]);
    cmd.env("STRATUM_OTHER_REPORTING_COLOUR", "blue");
    cmd.assert().success().stdout(predicate::str::contains("level: info"));
}

#[test]
fn test_missing_config_file_fails() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("absent.yaml");

    let mut cmd = stratum();
    cmd.args(["serve", "--check", "--config", path.to_str().expect("utf8 path")]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unable to read configuration"));
}

#[test]
fn test_check_reports_component_errors() {
    let mut cmd = stratum();
    cmd.args(["serve", "--check"]);
    cmd.env("STRATUM_SERVE_REPORTING_LEVEL", "stratum=loud");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unable to initialize reporter component"));
}

#[test]
fn test_check_does_not_write_pid_file() {
    let tmp = TempDir::new().expect("tmp");
    let pid_file = tmp.path().join("stratum.pid");

    let mut cmd = stratum();
    cmd.args(["serve", "--check"]);
    cmd.env("STRATUM_SERVE_DAEMON_PIDFILE", pid_file.to_str().expect("utf8 path"));
    cmd.assert().success();
    assert!(!pid_file.exists());
}
