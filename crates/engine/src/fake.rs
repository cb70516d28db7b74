// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted engine for testing the proxy without a real build.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    accepts, BuildEnvironment, EngineConnection, EngineConnector, EngineFailure, EngineOperation,
    EngineResult, IntermediateHandler, OperationType, OutputSink, ProgressEvent, ProgressListener,
};

/// Recorded engine interaction
#[derive(Debug, Clone, PartialEq)]
pub enum FakeCall {
    Connect(PathBuf),
    NewBuild,
    NewTestLauncher,
    Model(String),
    Action(Value),
    PhasedAction { projects_loaded: Value, build_finished: Value },
    ForTasks(Vec<String>),
    Arguments(Vec<String>),
    JvmArguments(Vec<String>),
    StandardOutput,
    StandardError,
    ProgressListener(Option<BTreeSet<OperationType>>),
    Run,
    ProjectsLoadedDelivered,
}

/// Environment returned by [`FakeOutcome::Environment`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeEnvironment {
    pub root_dir: PathBuf,
    pub java_home: PathBuf,
    pub jvm_arguments: Vec<String>,
    pub user_home: PathBuf,
    pub version: String,
}

impl BuildEnvironment for FakeEnvironment {
    fn root_dir(&self) -> PathBuf {
        self.root_dir.clone()
    }

    fn java_home(&self) -> PathBuf {
        self.java_home.clone()
    }

    fn jvm_arguments(&self) -> Vec<String> {
        self.jvm_arguments.clone()
    }

    fn user_home(&self) -> PathBuf {
        self.user_home.clone()
    }

    fn version(&self) -> String {
        self.version.clone()
    }
}

/// How a scripted run ends
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Value(Value),
    Environment(FakeEnvironment),
    Failure(EngineFailure),
    /// Unwind out of `run` with this payload
    Panic(String),
}

struct FakeState {
    calls: Vec<FakeCall>,
    stdout: Vec<Vec<u8>>,
    stderr: Vec<Vec<u8>>,
    events: Vec<ProgressEvent>,
    outcome: FakeOutcome,
    projects_loaded: Option<Value>,
    connect_failure: Option<EngineFailure>,
    operation_failure: Option<EngineFailure>,
    concurrent: bool,
}

/// Fake engine for testing.
///
/// Clones share state, so a test keeps one handle for scripting and
/// inspection while the proxy owns another.
#[derive(Clone)]
pub struct FakeEngine {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                stdout: Vec::new(),
                stderr: Vec::new(),
                events: Vec::new(),
                outcome: FakeOutcome::Value(Value::Null),
                projects_loaded: None,
                connect_failure: None,
                operation_failure: None,
                concurrent: false,
            })),
        }
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `chunk` to standard output during the run
    pub fn stdout(self, chunk: impl Into<Vec<u8>>) -> Self {
        self.inner.lock().stdout.push(chunk.into());
        self
    }

    /// Write `chunk` to standard error during the run
    pub fn stderr(self, chunk: impl Into<Vec<u8>>) -> Self {
        self.inner.lock().stderr.push(chunk.into());
        self
    }

    /// Report `event` to matching listeners during the run
    pub fn event(self, event: ProgressEvent) -> Self {
        self.inner.lock().events.push(event);
        self
    }

    pub fn outcome(self, outcome: FakeOutcome) -> Self {
        self.inner.lock().outcome = outcome;
        self
    }

    /// Intermediate result handed to a phased action's projects-loaded handler
    pub fn projects_loaded(self, value: Value) -> Self {
        self.inner.lock().projects_loaded = Some(value);
        self
    }

    /// Make `connect` fail
    pub fn fail_connect(self, failure: EngineFailure) -> Self {
        self.inner.lock().connect_failure = Some(failure);
        self
    }

    /// Make every operation constructor fail
    pub fn fail_operation(self, failure: EngineFailure) -> Self {
        self.inner.lock().operation_failure = Some(failure);
        self
    }

    /// Emit stdout, stderr and events from three threads at once
    pub fn concurrent(self) -> Self {
        self.inner.lock().concurrent = true;
        self
    }

    /// Get all recorded interactions
    pub fn calls(&self) -> Vec<FakeCall> {
        self.inner.lock().calls.clone()
    }

    fn record(&self, call: FakeCall) {
        self.inner.lock().calls.push(call);
    }

    fn operation(
        &self,
        call: FakeCall,
        on_projects_loaded: Option<IntermediateHandler>,
    ) -> Result<Box<dyn EngineOperation>, EngineFailure> {
        self.record(call);
        if let Some(failure) = self.inner.lock().operation_failure.clone() {
            return Err(failure);
        }
        Ok(Box::new(FakeOperation {
            engine: self.clone(),
            stdout: None,
            stderr: None,
            listeners: Vec::new(),
            on_projects_loaded,
        }))
    }
}

impl EngineConnector for FakeEngine {
    fn connect(&self, project_dir: &Path) -> Result<Box<dyn EngineConnection>, EngineFailure> {
        self.record(FakeCall::Connect(project_dir.to_path_buf()));
        if let Some(failure) = self.inner.lock().connect_failure.clone() {
            return Err(failure);
        }
        Ok(Box::new(self.clone()))
    }
}

impl EngineConnection for FakeEngine {
    fn new_build(&self) -> Result<Box<dyn EngineOperation>, EngineFailure> {
        self.operation(FakeCall::NewBuild, None)
    }

    fn new_test_launcher(&self) -> Result<Box<dyn EngineOperation>, EngineFailure> {
        self.operation(FakeCall::NewTestLauncher, None)
    }

    fn model(&self, model_type: &str) -> Result<Box<dyn EngineOperation>, EngineFailure> {
        self.operation(FakeCall::Model(model_type.to_string()), None)
    }

    fn action(&self, action: &Value) -> Result<Box<dyn EngineOperation>, EngineFailure> {
        self.operation(FakeCall::Action(action.clone()), None)
    }

    fn phased_action(
        &self,
        projects_loaded_action: &Value,
        on_projects_loaded: IntermediateHandler,
        build_finished_action: &Value,
    ) -> Result<Box<dyn EngineOperation>, EngineFailure> {
        self.operation(
            FakeCall::PhasedAction {
                projects_loaded: projects_loaded_action.clone(),
                build_finished: build_finished_action.clone(),
            },
            Some(on_projects_loaded),
        )
    }
}

struct FakeOperation {
    engine: FakeEngine,
    stdout: Option<OutputSink>,
    stderr: Option<OutputSink>,
    listeners: Vec<(ProgressListener, Option<BTreeSet<OperationType>>)>,
    on_projects_loaded: Option<IntermediateHandler>,
}

fn emit(events: &[ProgressEvent], listeners: &[(ProgressListener, Option<BTreeSet<OperationType>>)]) {
    for event in events {
        for (listener, filter) in listeners {
            if accepts(filter.as_ref(), event.operation_type) {
                listener(event);
            }
        }
    }
}

fn write_all(chunks: &[Vec<u8>], sink: Option<&mut OutputSink>) {
    if let Some(sink) = sink {
        for chunk in chunks {
            sink(chunk);
        }
    }
}

impl EngineOperation for FakeOperation {
    fn for_tasks(&mut self, tasks: &[String]) {
        self.engine.record(FakeCall::ForTasks(tasks.to_vec()));
    }

    fn with_arguments(&mut self, arguments: &[String]) {
        self.engine.record(FakeCall::Arguments(arguments.to_vec()));
    }

    fn set_jvm_arguments(&mut self, jvm_arguments: &[String]) {
        self.engine.record(FakeCall::JvmArguments(jvm_arguments.to_vec()));
    }

    fn set_standard_output(&mut self, sink: OutputSink) {
        self.engine.record(FakeCall::StandardOutput);
        self.stdout = Some(sink);
    }

    fn set_standard_error(&mut self, sink: OutputSink) {
        self.engine.record(FakeCall::StandardError);
        self.stderr = Some(sink);
    }

    fn add_progress_listener(
        &mut self,
        listener: ProgressListener,
        operation_types: Option<BTreeSet<OperationType>>,
    ) {
        self.engine.record(FakeCall::ProgressListener(operation_types.clone()));
        self.listeners.push((listener, operation_types));
    }

    fn run(self: Box<Self>) -> Result<EngineResult, EngineFailure> {
        let FakeOperation { engine, mut stdout, mut stderr, listeners, on_projects_loaded } = *self;
        engine.record(FakeCall::Run);

        let (out_chunks, err_chunks, events, outcome, projects_loaded, concurrent) = {
            let state = engine.inner.lock();
            (
                state.stdout.clone(),
                state.stderr.clone(),
                state.events.clone(),
                state.outcome.clone(),
                state.projects_loaded.clone(),
                state.concurrent,
            )
        };

        if concurrent {
            std::thread::scope(|scope| {
                scope.spawn(|| write_all(&out_chunks, stdout.as_mut()));
                scope.spawn(|| write_all(&err_chunks, stderr.as_mut()));
                scope.spawn(|| emit(&events, &listeners));
            });
        } else {
            write_all(&out_chunks, stdout.as_mut());
            write_all(&err_chunks, stderr.as_mut());
            emit(&events, &listeners);
        }

        if let (Some(handler), Some(value)) = (on_projects_loaded, projects_loaded) {
            handler(EngineResult::Value(value));
            engine.record(FakeCall::ProjectsLoadedDelivered);
        }

        match outcome {
            FakeOutcome::Value(value) => Ok(EngineResult::Value(value)),
            FakeOutcome::Environment(env) => Ok(EngineResult::Environment(Box::new(env))),
            FakeOutcome::Failure(failure) => Err(failure),
            FakeOutcome::Panic(message) => std::panic::resume_unwind(Box::new(message)),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
