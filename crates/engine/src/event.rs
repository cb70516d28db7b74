// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress events as the engine reports them.

use std::time::SystemTime;

/// Category of the operation an event reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationType {
    Generic,
    Task,
    Test,
    TestOutput,
    WorkItem,
    ProjectConfiguration,
    Transform,
    FileDownload,
    BuildPhase,
}

/// How an operation finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    Success,
    Failure(String),
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPhase {
    Start,
    Finish(OperationResult),
    Status { total: u64, progress: u64, unit: String },
}

/// The operation an event belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationInfo {
    pub name: String,
    pub display_name: String,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub operation_type: OperationType,
    pub phase: EventPhase,
    pub event_time: SystemTime,
    pub display_name: String,
    /// Human-readable description; may be empty
    pub description: String,
    pub operation: OperationInfo,
}

impl ProgressEvent {
    /// Start event for `name`, described as `"<display_name> started"`
    pub fn started(operation_type: OperationType, name: &str, display_name: &str) -> Self {
        Self {
            operation_type,
            phase: EventPhase::Start,
            event_time: SystemTime::now(),
            display_name: format!("{display_name} started"),
            description: display_name.to_string(),
            operation: OperationInfo {
                name: name.to_string(),
                display_name: display_name.to_string(),
                parent: None,
            },
        }
    }

    /// Finish event for `name` with the given result
    pub fn finished(
        operation_type: OperationType,
        name: &str,
        display_name: &str,
        result: OperationResult,
    ) -> Self {
        let verb = match &result {
            OperationResult::Success => "succeeded",
            OperationResult::Failure(_) => "failed",
            OperationResult::Skipped => "skipped",
        };
        Self {
            operation_type,
            phase: EventPhase::Finish(result),
            event_time: SystemTime::now(),
            display_name: format!("{display_name} {verb}"),
            description: display_name.to_string(),
            operation: OperationInfo {
                name: name.to_string(),
                display_name: display_name.to_string(),
                parent: None,
            },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.operation.parent = Some(parent.into());
        self
    }
}
