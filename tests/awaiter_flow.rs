use await_resources::awaiter::{AwaitError, Awaiter, RETRY_DELAY};
use await_resources::dispatch::{build_from_strings, ConfigError};
use std::time::Duration;

#[path = "common/mod.rs"]
mod common;

#[tokio::test(flavor = "multi_thread")]
async fn open_socket_and_existing_file_are_available() {
    let (_listener, addr) = common::open_listener();
    let dir = tempfile::tempdir().expect("tempdir");
    let marker = dir.path().join("ready");
    std::fs::write(&marker, b"ok").expect("write marker");

    let tcp = format!("tcp://{addr}");
    let file = format!("file://{}", marker.display());
    let resources = common::resources(&[tcp.as_str(), file.as_str()]);

    let summary = Awaiter::new(Duration::from_secs(5))
        .run(&resources)
        .await
        .expect("all available");
    assert_eq!(summary.attempts, vec![1, 1]);
}

#[tokio::test(flavor = "multi_thread")]
async fn file_created_later_is_picked_up() {
    let dir = tempfile::tempdir().expect("tempdir");
    let marker = dir.path().join("late");
    let file = format!("file://{}", marker.display());
    let resources = common::resources(&[file.as_str()]);

    let writer = {
        let marker = marker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(RETRY_DELAY).await;
            tokio::fs::write(&marker, b"ok").await.expect("write marker");
        })
    };

    let summary = Awaiter::new(Duration::from_secs(10))
        .run(&resources)
        .await
        .expect("file eventually exists");
    writer.await.expect("writer task");
    assert!(summary.attempts[0] >= 2, "attempts: {:?}", summary.attempts);
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_port_times_out_with_latest_reason() {
    let port = common::closed_port();
    let tcp = format!("tcp://127.0.0.1:{port}");
    let resources = common::resources(&[tcp.as_str()]);

    let err = Awaiter::new(Duration::from_millis(1200))
        .run(&resources)
        .await
        .expect_err("nothing listens");

    match err {
        AwaitError::TimedOut {
            resource, timeout, ..
        } => {
            assert_eq!(resource, tcp);
            assert_eq!(timeout, Duration::from_millis(1200));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn later_resources_wait_for_earlier_ones() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    std::fs::write(&second, b"ok").expect("write second");

    let first_locator = format!("file://{}", first.display());
    let second_locator = format!("file://{}", second.display());
    let resources = common::resources(&[first_locator.as_str(), second_locator.as_str()]);

    let err = Awaiter::new(Duration::from_millis(800))
        .run(&resources)
        .await
        .expect_err("first never appears");
    assert!(err.is_timeout());
    assert!(
        err.to_string().contains(&first_locator),
        "unexpected error: {err}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_timeout_reports_unfinished_initial_attempt() {
    let resources = common::resources(&["tcp://127.0.0.1:9"]);
    let err = Awaiter::new(Duration::ZERO)
        .run(&resources)
        .await
        .expect_err("no time at all");

    match err {
        AwaitError::TimedOut { source, .. } => {
            assert_eq!(source.to_string(), "initial await did not finish");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn commands_gate_on_exit_status() {
    let resources = common::resources(&["true", "test%20-d%20/"]);
    Awaiter::new(Duration::from_secs(5))
        .run(&resources)
        .await
        .expect("commands succeed");

    let failing = common::resources(&["false"]);
    let err = Awaiter::new(Duration::from_millis(700))
        .run(&failing)
        .await
        .expect_err("false never succeeds");
    assert!(err.is_timeout());
}

#[test]
fn configuration_errors_fail_before_probing() {
    let err = build_from_strings(["tcp://db:5432", "smtp://mail"]).expect_err("unsupported");
    assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));
}
