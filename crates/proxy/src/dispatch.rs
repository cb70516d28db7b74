// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs the requested operation against the engine.

use std::path::PathBuf;
use std::sync::Arc;

use tp_engine::{EngineConnection, EngineConnector, EngineFailure, EngineResult};
use tp_wire::{Operation, OperationDescriptor, ServerMessage};
use tracing::{debug, info, warn};

use crate::convert::{failure_chain, normalize, operation_type};
use crate::relay::EventRelay;

/// Build, configure and run the operation `descriptor` asks for, blocking
/// until the engine finishes.
pub fn execute(
    descriptor: &OperationDescriptor,
    connection: &dyn EngineConnection,
    relay: &EventRelay,
) -> Result<EngineResult, EngineFailure> {
    let mut operation = match &descriptor.operation {
        Operation::BuildLaunch { .. } => connection.new_build()?,
        Operation::TestLaunch => connection.new_test_launcher()?,
        Operation::ModelFetch { model_type, .. } => connection.model(model_type)?,
        Operation::ActionRun { action, .. } => connection.action(action)?,
        Operation::PhasedActionRun { projects_loaded_action, build_finished_action, .. } => {
            // The projects-loaded result is not needed; only the
            // build-finished result becomes the outcome.
            connection.phased_action(
                projects_loaded_action,
                Box::new(|result: EngineResult| debug!(?result, "discarding projects-loaded result")),
                build_finished_action,
            )?
        }
    };

    if let Some(tasks) = descriptor.operation.requested_tasks() {
        operation.for_tasks(tasks);
    }
    operation.set_standard_output(relay.stdout_sink());
    operation.set_standard_error(relay.stderr_sink());

    let kinds = descriptor.progress_event_kinds.iter().copied().map(operation_type).collect();
    operation.add_progress_listener(relay.progress_listener(), Some(kinds));
    operation.add_progress_listener(relay.description_listener(), None);

    operation.with_arguments(&descriptor.arguments);
    operation.set_jvm_arguments(&descriptor.jvm_arguments);

    operation.run()
}

/// Connect to the engine, run the operation on a blocking worker and turn
/// the outcome into the terminal message
pub async fn run_operation(
    connector: Arc<dyn EngineConnector>,
    project_dir: PathBuf,
    descriptor: OperationDescriptor,
    relay: EventRelay,
) -> ServerMessage {
    let operation = descriptor.operation.name();
    info!(operation, project_dir = %project_dir.display(), "starting build operation");

    let worker = tokio::task::spawn_blocking(move || {
        let connection = connector.connect(&project_dir)?;
        execute(&descriptor, connection.as_ref(), &relay)
    });

    let outcome = match worker.await {
        Ok(outcome) => outcome,
        Err(e) => Err(worker_failure(e)),
    };

    match outcome {
        Ok(result) => {
            info!(operation, "build operation succeeded");
            ServerMessage::Success { payload: normalize(result) }
        }
        Err(failure) => {
            warn!(operation, error = %failure, "build operation failed");
            ServerMessage::Failure { failure: failure_chain(&failure) }
        }
    }
}

fn worker_failure(err: tokio::task::JoinError) -> EngineFailure {
    if !err.is_panic() {
        return EngineFailure::new("Cancelled", "build worker was cancelled");
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "build worker panicked".to_string());
    EngineFailure::new("Panic", message)
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
