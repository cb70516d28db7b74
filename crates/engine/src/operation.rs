// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capabilities the proxy needs from a build engine client.
//!
//! Everything here is synchronous: the proxy runs operations on a blocking
//! worker, and engines may invoke sinks and listeners from their own threads.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{EngineFailure, OperationType, ProgressEvent};

/// Receives raw chunks written to one of the build's output streams
pub type OutputSink = Box<dyn FnMut(&[u8]) + Send>;

/// Receives progress events; may be called from any engine thread
pub type ProgressListener = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Receives the intermediate result of a phased action
pub type IntermediateHandler = Box<dyn FnOnce(EngineResult) + Send>;

/// Build environment as a live engine object
pub trait BuildEnvironment: Send {
    fn root_dir(&self) -> PathBuf;
    fn java_home(&self) -> PathBuf;
    fn jvm_arguments(&self) -> Vec<String>;
    fn user_home(&self) -> PathBuf;
    fn version(&self) -> String;
}

/// Value produced by a successful operation
pub enum EngineResult {
    /// Serializable value, passed through as is
    Value(serde_json::Value),

    /// Environment description backed by the engine; must be copied out
    /// before it can leave the process
    Environment(Box<dyn BuildEnvironment>),
}

impl std::fmt::Debug for EngineResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineResult::Value(value) => f.debug_tuple("Value").field(value).finish(),
            EngineResult::Environment(env) => f
                .debug_struct("Environment")
                .field("root_dir", &env.root_dir())
                .field("version", &env.version())
                .finish_non_exhaustive(),
        }
    }
}

/// Opens connections to the engine for a project
pub trait EngineConnector: Send + Sync {
    fn connect(&self, project_dir: &Path) -> Result<Box<dyn EngineConnection>, EngineFailure>;
}

/// A connection able to construct each kind of build operation
pub trait EngineConnection: Send {
    fn new_build(&self) -> Result<Box<dyn EngineOperation>, EngineFailure>;

    fn new_test_launcher(&self) -> Result<Box<dyn EngineOperation>, EngineFailure>;

    fn model(&self, model_type: &str) -> Result<Box<dyn EngineOperation>, EngineFailure>;

    fn action(&self, action: &serde_json::Value) -> Result<Box<dyn EngineOperation>, EngineFailure>;

    /// Action with a projects-loaded checkpoint; `run` yields the
    /// build-finished result, `on_projects_loaded` gets the intermediate one.
    fn phased_action(
        &self,
        projects_loaded_action: &serde_json::Value,
        on_projects_loaded: IntermediateHandler,
        build_finished_action: &serde_json::Value,
    ) -> Result<Box<dyn EngineOperation>, EngineFailure>;
}

/// A configured, not yet started build operation
pub trait EngineOperation: Send {
    fn for_tasks(&mut self, tasks: &[String]);

    fn with_arguments(&mut self, arguments: &[String]);

    fn set_jvm_arguments(&mut self, jvm_arguments: &[String]);

    fn set_standard_output(&mut self, sink: OutputSink);

    fn set_standard_error(&mut self, sink: OutputSink);

    /// Register a listener; `None` receives every event, `Some(types)` only
    /// events of those types (an empty set receives nothing).
    fn add_progress_listener(
        &mut self,
        listener: ProgressListener,
        operation_types: Option<BTreeSet<OperationType>>,
    );

    /// Run to completion, blocking the calling thread
    fn run(self: Box<Self>) -> Result<EngineResult, EngineFailure>;
}

/// Whether a listener registered with `filter` should see `operation_type`
pub fn accepts(filter: Option<&BTreeSet<OperationType>>, operation_type: OperationType) -> bool {
    filter.map_or(true, |types| types.contains(&operation_type))
}
