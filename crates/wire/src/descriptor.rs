// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation descriptor sent once by the IDE at the start of a session.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Model type name that asks the engine for its build environment
pub const BUILD_ENVIRONMENT_MODEL: &str = "BuildEnvironment";

/// Category of progress events the IDE wants to receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
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

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::Generic,
        EventKind::Task,
        EventKind::Test,
        EventKind::TestOutput,
        EventKind::WorkItem,
        EventKind::ProjectConfiguration,
        EventKind::Transform,
        EventKind::FileDownload,
        EventKind::BuildPhase,
    ];
}

/// The kind of build operation to run.
///
/// Actions are opaque to the proxy; only the engine interprets them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Run tasks (engine defaults when `tasks` is empty)
    BuildLaunch {
        #[serde(default)]
        tasks: Vec<String>,
    },

    /// Launch tests
    TestLaunch,

    /// Fetch a model by type name
    ModelFetch {
        model_type: String,
        #[serde(default)]
        tasks: Vec<String>,
    },

    /// Run a build action
    ActionRun {
        action: serde_json::Value,
        #[serde(default)]
        tasks: Vec<String>,
    },

    /// Run a build action with a projects-loaded checkpoint
    PhasedActionRun {
        projects_loaded_action: serde_json::Value,
        build_finished_action: serde_json::Value,
        #[serde(default)]
        tasks: Vec<String>,
    },
}

impl Operation {
    /// Tasks requested by the IDE, or `None` when the engine default applies.
    ///
    /// An empty list means "unset", never "run nothing".
    pub fn requested_tasks(&self) -> Option<&[String]> {
        let tasks = match self {
            Operation::BuildLaunch { tasks }
            | Operation::ModelFetch { tasks, .. }
            | Operation::ActionRun { tasks, .. }
            | Operation::PhasedActionRun { tasks, .. } => tasks.as_slice(),
            Operation::TestLaunch => return None,
        };
        if tasks.is_empty() {
            None
        } else {
            Some(tasks)
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::BuildLaunch { .. } => "build_launch",
            Operation::TestLaunch => "test_launch",
            Operation::ModelFetch { .. } => "model_fetch",
            Operation::ActionRun { .. } => "action_run",
            Operation::PhasedActionRun { .. } => "phased_action_run",
        }
    }
}

/// Everything needed to run one build operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationDescriptor {
    #[serde(flatten)]
    pub operation: Operation,

    #[serde(default)]
    pub arguments: Vec<String>,

    #[serde(default)]
    pub jvm_arguments: Vec<String>,

    #[serde(default)]
    pub progress_event_kinds: BTreeSet<EventKind>,
}

impl OperationDescriptor {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            arguments: Vec::new(),
            jvm_arguments: Vec::new(),
            progress_event_kinds: BTreeSet::new(),
        }
    }

    pub fn arguments(mut self, arguments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn jvm_arguments(mut self, arguments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.jvm_arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn progress_event_kinds(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.progress_event_kinds = kinds.into_iter().collect();
        self
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
