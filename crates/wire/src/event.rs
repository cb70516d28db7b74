// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build events relayed while an operation runs.

use serde::{Deserialize, Serialize};

use crate::EventKind;

/// Payload of a `BuildEvent` message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum BuildEvent {
    /// Structured progress event, restricted to the requested kinds
    Progress(ProgressEvent),

    /// Plain human-readable description of any engine event
    Description { text: String },
}

/// How a finished operation ended
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FinishResult {
    Success,
    Failure { message: String },
    Skipped,
}

/// Where in its lifetime the reported operation is
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ProgressPhase {
    Start,
    Finish { outcome: FinishResult },
    Status { total: u64, progress: u64, unit: String },
}

/// Connection-safe copy of an engine progress event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEvent {
    pub kind: EventKind,
    #[serde(flatten)]
    pub phase: ProgressPhase,
    pub event_time_ms: u64,
    pub display_name: String,
    pub operation_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_operation: Option<String>,
}
