// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-native values to wire shapes.

use std::time::UNIX_EPOCH;

use tp_engine::{EngineFailure, EngineResult, EventPhase, OperationResult, OperationType};
use tp_wire::{
    EnvironmentRecord, EventKind, FailureCause, FailureChain, FinishResult, OutcomePayload,
    ProgressEvent, ProgressPhase,
};

/// Copy a result into a payload that can cross the wire.
///
/// Environment handles are read field by field into an [`EnvironmentRecord`];
/// plain values pass through unchanged.
pub fn normalize(result: EngineResult) -> OutcomePayload {
    match result {
        EngineResult::Value(value) => OutcomePayload::Value(value),
        EngineResult::Environment(env) => OutcomePayload::Environment(EnvironmentRecord {
            root_directory: env.root_dir(),
            java_home: env.java_home(),
            jvm_arguments: env.jvm_arguments(),
            build_tool_user_home: env.user_home(),
            build_tool_version: env.version(),
        }),
    }
}

/// Outermost-first list of every failure in the cause chain
pub fn failure_chain(failure: &EngineFailure) -> FailureChain {
    FailureChain::new(
        failure
            .chain()
            .map(|f| FailureCause { kind: f.kind().to_string(), message: f.message().to_string() })
            .collect(),
    )
}

pub fn event_kind(operation_type: OperationType) -> EventKind {
    match operation_type {
        OperationType::Generic => EventKind::Generic,
        OperationType::Task => EventKind::Task,
        OperationType::Test => EventKind::Test,
        OperationType::TestOutput => EventKind::TestOutput,
        OperationType::WorkItem => EventKind::WorkItem,
        OperationType::ProjectConfiguration => EventKind::ProjectConfiguration,
        OperationType::Transform => EventKind::Transform,
        OperationType::FileDownload => EventKind::FileDownload,
        OperationType::BuildPhase => EventKind::BuildPhase,
    }
}

pub fn operation_type(kind: EventKind) -> OperationType {
    match kind {
        EventKind::Generic => OperationType::Generic,
        EventKind::Task => OperationType::Task,
        EventKind::Test => OperationType::Test,
        EventKind::TestOutput => OperationType::TestOutput,
        EventKind::WorkItem => OperationType::WorkItem,
        EventKind::ProjectConfiguration => OperationType::ProjectConfiguration,
        EventKind::Transform => OperationType::Transform,
        EventKind::FileDownload => OperationType::FileDownload,
        EventKind::BuildPhase => OperationType::BuildPhase,
    }
}

/// Wire form of an engine progress event
pub fn convert_event(event: &tp_engine::ProgressEvent) -> ProgressEvent {
    let phase = match &event.phase {
        EventPhase::Start => ProgressPhase::Start,
        EventPhase::Finish(result) => ProgressPhase::Finish {
            outcome: match result {
                OperationResult::Success => FinishResult::Success,
                OperationResult::Failure(message) => FinishResult::Failure { message: message.clone() },
                OperationResult::Skipped => FinishResult::Skipped,
            },
        },
        EventPhase::Status { total, progress, unit } => {
            ProgressPhase::Status { total: *total, progress: *progress, unit: unit.clone() }
        }
    };
    let event_time_ms = event
        .event_time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    ProgressEvent {
        kind: event_kind(event.operation_type),
        phase,
        event_time_ms,
        display_name: event.display_name.clone(),
        operation_name: event.operation.name.clone(),
        parent_operation: event.operation.parent.clone(),
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
