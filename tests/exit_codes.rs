#![cfg(unix)]

use std::process::{Command, Output};
use std::time::{Duration, Instant};

#[path = "common/mod.rs"]
mod common;

fn run_await(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_await"))
        .args(args)
        .env_remove("AWAIT_TIMEOUT")
        .env_remove("AWAIT_VERBOSITY")
        .output()
        .expect("spawn await binary")
}

#[test]
fn timeout_without_force_fails_and_skips_command() {
    let locator = format!("tcp://127.0.0.1:{}", common::closed_port());
    let output = run_await(&["-t", "300ms", &locator, "--", "echo", "ran"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("ran"));
}

#[test]
fn force_runs_command_after_timeout() {
    let locator = format!("tcp://127.0.0.1:{}", common::closed_port());
    let output = run_await(&["-f", "-t", "300ms", &locator, "--", "echo", "ran"]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ran");
}

#[test]
fn command_exit_code_is_passed_through() {
    let (_listener, addr) = common::open_listener();
    let locator = format!("tcp://{addr}");
    let output = run_await(&["-t", "5s", &locator, "--", "sh", "-c", "exit 3"]);

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn unknown_flag_prints_usage_and_fails() {
    let output = run_await(&["-x"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage: await"));
}

#[test]
fn timeout_default_comes_from_environment() {
    let locator = format!("tcp://127.0.0.1:{}", common::closed_port());
    let started = Instant::now();
    let output = Command::new(env!("CARGO_BIN_EXE_await"))
        .args([locator.as_str(), "--", "echo", "ran"])
        .env("AWAIT_TIMEOUT", "300ms")
        .output()
        .expect("spawn await binary");

    assert_eq!(output.status.code(), Some(1));
    assert!(started.elapsed() < Duration::from_secs(30));
}
