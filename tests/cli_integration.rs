//! CLI integration tests
//!
//! Tests the rpc-balancer binary end-to-end for commands that exit before
//! binding the listen socket.

use assert_cmd::Command;
use predicates::prelude::*;

fn balancer() -> Command {
    Command::cargo_bin("rpc-balancer").unwrap()
}

// ==================== Basic CLI tests ====================

#[test]
fn test_version() {
    balancer()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rpc-balancer"));
}

#[test]
fn test_help() {
    balancer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("JSON-RPC load balancer"));
}

#[test]
fn test_help_shows_registration_example() {
    balancer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("rpc_location"));
}

// ==================== Error handling tests ====================

#[test]
fn test_missing_explicit_config_fails() {
    balancer()
        .args(["--config", "/nonexistent/balancer.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config file"));
}

#[test]
fn test_invalid_strategy_fails() {
    balancer()
        .args(["--strategy", "fastest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid strategy"));
}

#[test]
fn test_invalid_address_fails() {
    balancer()
        .args(["--address", "not an address"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid listen address"));
}

#[test]
fn test_quiet_conflicts_with_verbose() {
    balancer().args(["-q", "-v"]).assert().failure();
}

#[test]
fn test_malformed_config_file_fails() {
    let dir = std::env::temp_dir().join("rpc-balancer-cli-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("broken.toml");
    std::fs::write(&path, "[balancer\naddress = ").unwrap();

    balancer()
        .args(["--config", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse error"));
}
