// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup and handshake specs

use crate::prelude::*;

#[test]
fn announces_host_and_port() {
    let dir = tempfile::tempdir().unwrap();
    let running = proxy().project(dir.path()).wait_timeout_ms(200).start();

    assert_eq!(
        running.announced,
        format!("Gradle target server hostName: 127.0.0.1 port: {}", running.port)
    );
    running.finish().fails();
}

#[test]
fn no_connection_times_out_with_exit_code_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = assert_cmd::Command::new(binary())
        .env("targetHost", "127.0.0.1")
        .env("TOOLING_PROXY_PROJECT_DIR", dir.path())
        .env("TOOLING_PROXY_WAIT_TIMEOUT_MS", "200")
        .env("TOOLING_PROXY_POLL_INTERVAL_MS", "10")
        .env_remove("RUST_LOG")
        .assert()
        .code(1)
        .get_output()
        .clone();

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.starts_with("Gradle target server hostName: "), "{stdout}");
    assert_eq!(stdout.lines().count(), 1, "{stdout}");
    assert_eq!(stderr.matches("incoming connection").count(), 1, "{stderr}");
}

#[test]
fn silent_ide_times_out_waiting_for_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let running = proxy().project(dir.path()).wait_timeout_ms(300).start();
    let _peer = running.connect();

    running.finish().fails().stderr_has("build parameters").stdout_is_quiet();
}

#[test]
fn unresolvable_bind_host_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let running = proxy()
        .env("targetHost", "no-such-host.invalid")
        .env("TOOLING_PROXY_TARGET_LOCAL", "1")
        .project(dir.path())
        .wait_timeout_ms(200)
        .start();

    assert!(running.announced.contains("hostName: 127.0.0.1 port: "), "{}", running.announced);
    running.finish().fails();
}

#[test]
fn missing_project_directory_is_fatal() {
    let output = assert_cmd::Command::new(binary())
        .env("TOOLING_PROXY_PROJECT_DIR", "/definitely/not/a/project")
        .assert()
        .code(1)
        .get_output()
        .clone();

    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("project directory"));
}

#[test]
fn verbosity_token_enables_logging() {
    let dir = tempfile::tempdir().unwrap();
    proxy()
        .arg("--info")
        .project(dir.path())
        .wait_timeout_ms(200)
        .start()
        .finish()
        .fails()
        .stderr_has("listening for the IDE connection");
}

#[test]
fn malformed_parameters_fail_the_proxy() {
    let dir = tempfile::tempdir().unwrap();
    let running = proxy().project(dir.path()).start();
    let mut peer = running.connect();
    peer.send_raw(b"{not json");

    running.finish().fails().stderr_has("protocol error");
}
