// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full IDE sessions against the command-line engine

use tp_wire::{BuildEvent, EventKind, OutcomePayload};

use crate::prelude::*;

#[test]
fn action_run_is_reported_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    let running = proxy().project(dir.path()).start();
    let mut peer = running.connect();
    peer.send_parameters(OperationDescriptor::new(Operation::ActionRun {
        action: json!({"class": "com.example.SyncAction"}),
        tasks: vec![],
    }));

    let messages = peer.recv_until_terminal();
    match messages.last() {
        Some(ServerMessage::Failure { failure }) => {
            assert_eq!(
                failure.head().map(|c| c.kind.as_str()),
                Some("UnsupportedOperationException")
            );
        }
        other => panic!("expected failure, got {other:?}"),
    }
    peer.ack();

    running.finish().passes().stdout_is_quiet();
}

#[test]
fn exit_code_is_zero_without_ack() {
    let dir = tempfile::tempdir().unwrap();
    let running = proxy().project(dir.path()).start();
    let mut peer = running.connect();
    peer.send_parameters(OperationDescriptor::new(Operation::ModelFetch {
        model_type: "IdeaProject".into(),
        tasks: vec![],
    }));
    assert!(peer.recv_until_terminal().last().is_some_and(ServerMessage::is_terminal));
    drop(peer);

    running.finish().passes();
}

#[cfg(unix)]
#[test]
fn build_output_and_tasks_are_relayed() {
    let project = project_with_wrapper(
        r#"echo "> Task :compileJava"
echo "> Task :assemble"
echo "BUILD SUCCESSFUL in 1s""#,
    );
    let running = proxy().project(project.path()).start();
    let mut peer = running.connect();
    peer.send_parameters(
        OperationDescriptor::new(Operation::BuildLaunch { tasks: vec!["assemble".into()] })
            .progress_event_kinds([EventKind::Task]),
    );

    let messages = peer.recv_until_terminal();
    peer.ack();

    let output: Vec<u8> = messages
        .iter()
        .filter_map(|m| match m {
            ServerMessage::StandardOutput { bytes } => Some(bytes.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    assert!(String::from_utf8_lossy(&output).contains("BUILD SUCCESSFUL"));
    assert!(messages.iter().any(|m| matches!(
        m,
        ServerMessage::BuildEvent { event: BuildEvent::Progress(p) } if p.kind == EventKind::Task
    )));
    assert_eq!(
        messages.last(),
        Some(&ServerMessage::Success { payload: OutcomePayload::Value(serde_json::Value::Null) })
    );
    running.finish().passes();
}

#[cfg(unix)]
#[test]
fn failing_build_carries_its_cause() {
    let project = project_with_wrapper(
        r#"echo "FAILURE: Build failed with an exception." >&2
echo "* What went wrong:" >&2
echo "Execution failed for task ':app:compileJava'." >&2
exit 1"#,
    );
    let running = proxy().project(project.path()).start();
    let mut peer = running.connect();
    peer.send_parameters(OperationDescriptor::new(Operation::BuildLaunch { tasks: vec![] }));

    let messages = peer.recv_until_terminal();
    peer.ack();

    match messages.last() {
        Some(ServerMessage::Failure { failure }) => {
            assert_eq!(failure.head().map(|c| c.kind.as_str()), Some("BuildException"));
            assert_eq!(
                failure.root_cause().map(|c| c.message.as_str()),
                Some("Execution failed for task ':app:compileJava'.")
            );
        }
        other => panic!("expected failure, got {other:?}"),
    }
    running.finish().passes();
}
