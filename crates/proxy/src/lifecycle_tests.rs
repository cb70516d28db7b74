// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use serde_json::json;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tp_engine::{EngineFailure, FakeCall, FakeEngine, FakeEnvironment, FakeOutcome, OperationType, ProgressEvent};
use tp_wire::{
    BuildEvent, EventKind, FailureCause, Operation, OperationDescriptor, OutcomePayload,
    ServerMessage,
};

use super::*;
use crate::test_support::{stdout_chunks, TestPeer};

fn config(wait_timeout: Duration) -> Config {
    Config {
        bind_hint: Some("127.0.0.1".to_string()),
        local: true,
        wait_timeout,
        poll_interval: Duration::from_millis(5),
        project_dir: PathBuf::from("/work/app"),
        gradle_executable: None,
    }
}

/// Bound proxy serving `engine` in the background
async fn serving(engine: &FakeEngine) -> (u16, JoinHandle<Result<(), ProxyError>>) {
    let proxy = Proxy::bind(config(Duration::from_secs(5))).await.unwrap();
    let port = proxy.endpoint().port;
    let connector: Arc<dyn EngineConnector> = Arc::new(engine.clone());
    (port, tokio::spawn(proxy.serve(connector)))
}

async fn connect(port: u16) -> TestPeer<TcpStream> {
    TestPeer::new(TcpStream::connect(("127.0.0.1", port)).await.unwrap())
}

/// Run `descriptor` through a full session, returning everything the peer saw
async fn session_with(engine: &FakeEngine, descriptor: OperationDescriptor) -> Vec<ServerMessage> {
    let (port, serve) = serving(engine).await;
    let mut peer = connect(port).await;
    peer.send_parameters(descriptor).await;
    let messages = peer.recv_until_terminal().await;
    peer.ack().await;
    serve.await.unwrap().unwrap();
    messages
}

async fn refuses_connections(port: u16) -> bool {
    for _ in 0..200 {
        if TcpStream::connect(("127.0.0.1", port)).await.is_err() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

#[test]
fn session_errors_map_onto_proxy_errors() {
    assert!(matches!(
        ProxyError::from(SessionError::Protocol("bad".into())),
        ProxyError::Protocol(m) if m == "bad"
    ));
    assert!(matches!(
        ProxyError::from(SessionError::NotConnected),
        ProxyError::Session(SessionError::NotConnected)
    ));
}

#[test]
fn timeout_names_what_it_waited_for() {
    let err = ProxyError::Timeout { stage: WaitStage::Connection, after: Duration::from_secs(5) };
    assert_eq!(err.to_string(), "timed out after 5s waiting for incoming connection");
}

#[tokio::test]
async fn build_launch_ends_with_success() {
    let engine = FakeEngine::new()
        .stdout("> Task :assemble\n")
        .event(ProgressEvent::started(OperationType::Task, ":assemble", "Task :assemble"))
        .outcome(FakeOutcome::Value(json!("OK")));
    let descriptor = OperationDescriptor::new(Operation::BuildLaunch {
        tasks: vec!["assemble".to_string()],
    })
    .progress_event_kinds([EventKind::Task]);

    let messages = session_with(&engine, descriptor).await;

    let (terminal, rest) = messages.split_last().unwrap();
    assert_eq!(
        terminal,
        &ServerMessage::Success { payload: OutcomePayload::Value(json!("OK")) }
    );
    assert!(rest.iter().all(|m| !m.is_terminal()));
    assert_eq!(stdout_chunks(rest), vec![b"> Task :assemble\n".to_vec()]);
    assert!(rest.iter().any(|m| matches!(
        m,
        ServerMessage::BuildEvent { event: BuildEvent::Progress(_) }
    )));
    assert!(engine.calls().contains(&FakeCall::ForTasks(vec!["assemble".to_string()])));
    assert!(engine.calls().contains(&FakeCall::Connect("/work/app".into())));
}

#[tokio::test]
async fn environment_fetch_is_normalized() {
    let engine = FakeEngine::new().outcome(FakeOutcome::Environment(FakeEnvironment {
        root_dir: "/work/app".into(),
        java_home: "/usr/lib/jvm/x".into(),
        jvm_arguments: vec!["-Xmx2g".into()],
        user_home: "/home/u/.gradle".into(),
        version: "8.5".into(),
    }));
    let descriptor = OperationDescriptor::new(Operation::ModelFetch {
        model_type: tp_wire::BUILD_ENVIRONMENT_MODEL.to_string(),
        tasks: vec![],
    });

    let messages = session_with(&engine, descriptor).await;

    match messages.last() {
        Some(ServerMessage::Success { payload: OutcomePayload::Environment(record) }) => {
            assert_eq!(record.java_home, Path::new("/usr/lib/jvm/x"));
            assert_eq!(record.build_tool_version, "8.5");
            assert_eq!(record.root_directory, Path::new("/work/app"));
        }
        other => panic!("expected environment success, got {other:?}"),
    }
}

#[tokio::test]
async fn failure_chain_is_delivered_in_order() {
    let failure = EngineFailure::new("EngineError", "task failed")
        .with_cause(EngineFailure::new("IOError", "disk full"));
    let engine = FakeEngine::new().outcome(FakeOutcome::Failure(failure));

    let messages =
        session_with(&engine, OperationDescriptor::new(Operation::BuildLaunch { tasks: vec![] }))
            .await;

    match messages.last() {
        Some(ServerMessage::Failure { failure }) => assert_eq!(
            failure.causes,
            vec![
                FailureCause { kind: "EngineError".into(), message: "task failed".into() },
                FailureCause { kind: "IOError".into(), message: "disk full".into() },
            ]
        ),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_engine_callbacks_arrive_whole() {
    let mut engine = FakeEngine::new().concurrent();
    for i in 0..50 {
        engine = engine
            .stdout(format!("out {i}\n"))
            .stderr(format!("err {i}\n"))
            .event(ProgressEvent::started(OperationType::Task, &format!(":t{i}"), "Task"));
    }
    let descriptor = OperationDescriptor::new(Operation::TestLaunch)
        .progress_event_kinds([EventKind::Task]);

    let messages = session_with(&engine, descriptor).await;

    let expected: Vec<Vec<u8>> = (0..50).map(|i| format!("out {i}\n").into_bytes()).collect();
    assert_eq!(stdout_chunks(&messages), expected);
    assert_eq!(messages.iter().filter(|m| m.is_terminal()).count(), 1);
    assert!(messages.last().is_some_and(|m| m.is_terminal()));
    assert!(!engine.calls().iter().any(|c| matches!(c, FakeCall::ForTasks(_))));
}

#[tokio::test]
async fn missing_ack_is_not_an_error() {
    let engine = FakeEngine::new();
    let (port, serve) = serving(&engine).await;
    let mut peer = connect(port).await;
    peer.send_parameters(OperationDescriptor::new(Operation::TestLaunch)).await;
    peer.recv_until_terminal().await;
    drop(peer);

    serve.await.unwrap().unwrap();
}

#[tokio::test]
async fn no_connection_times_out_and_releases_the_port() {
    let proxy = Proxy::bind(config(Duration::from_millis(100))).await.unwrap();
    let port = proxy.endpoint().port;
    let session = Arc::clone(proxy.session());

    let err = proxy.serve(Arc::new(FakeEngine::new())).await.unwrap_err();

    assert!(
        matches!(err, ProxyError::Timeout { stage: WaitStage::Connection, .. }),
        "expected connection timeout, got {err:?}"
    );
    assert!(err.to_string().contains("connection"));
    assert!(refuses_connections(port).await);
    assert!(!session.is_connected());
}

#[tokio::test]
async fn silent_peer_times_out_waiting_for_parameters() {
    let engine = FakeEngine::new();
    let proxy = Proxy::bind(config(Duration::from_millis(100))).await.unwrap();
    let port = proxy.endpoint().port;
    let serve = tokio::spawn(proxy.serve(Arc::new(engine.clone())));
    let _peer = connect(port).await;

    match serve.await.unwrap() {
        Err(ProxyError::Timeout { stage, .. }) => assert_eq!(stage, WaitStage::Parameters),
        other => panic!("expected parameters timeout, got {other:?}"),
    }
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn malformed_parameters_are_a_protocol_error() {
    let engine = FakeEngine::new();
    let (port, serve) = serving(&engine).await;
    let mut peer = connect(port).await;
    peer.send_raw(br#"{"type":"BuildParameters","parameters":{"operation":{"kind":"launch_rockets"}}}"#)
        .await;

    assert!(matches!(serve.await.unwrap(), Err(ProxyError::Protocol(_))));
    assert!(engine.calls().is_empty());
}
