// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build engine backed by the Gradle command line.
//!
//! Runs `gradlew` (or `gradle`) in the project directory with a plain
//! console, streams its output to the registered sinks as it is read, and
//! derives task/configuration/build progress events from the console lines.
//! Custom build actions need an in-process tooling client and are refused.

use std::collections::{BTreeSet, VecDeque};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::jdk;
use crate::{
    accepts, BuildEnvironment, EngineConnection, EngineConnector, EngineFailure, EngineOperation,
    EngineResult, IntermediateHandler, OperationResult, OperationType, OutputSink,
    ProgressEvent, ProgressListener,
};

const READ_CHUNK: usize = 8 * 1024;
/// Stderr lines kept for the failure report
const STDERR_TAIL_LINES: usize = 1000;
const BUILD_ENVIRONMENT_MODEL: &str = "BuildEnvironment";

/// Connector that drives the Gradle command line
#[derive(Debug, Clone, Default)]
pub struct GradleProcessConnector {
    executable: Option<PathBuf>,
}

impl GradleProcessConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `executable` instead of looking for a wrapper in the project
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self { executable: Some(executable.into()) }
    }
}

impl EngineConnector for GradleProcessConnector {
    fn connect(&self, project_dir: &Path) -> Result<Box<dyn EngineConnection>, EngineFailure> {
        if !project_dir.is_dir() {
            return Err(EngineFailure::new(
                "GradleConnectionException",
                format!("Project directory '{}' does not exist", project_dir.display()),
            ));
        }
        let executable = self.executable.clone().unwrap_or_else(|| locate_gradle(project_dir));
        tracing::debug!(
            project_dir = %project_dir.display(),
            executable = %executable.display(),
            "connected to command-line engine"
        );
        Ok(Box::new(GradleProcessConnection { project_dir: project_dir.to_path_buf(), executable }))
    }
}

/// Project wrapper script if present, otherwise `gradle` from PATH
fn locate_gradle(project_dir: &Path) -> PathBuf {
    let wrapper = project_dir.join(if cfg!(windows) { "gradlew.bat" } else { "gradlew" });
    if wrapper.is_file() {
        wrapper
    } else {
        PathBuf::from("gradle")
    }
}

struct GradleProcessConnection {
    project_dir: PathBuf,
    executable: PathBuf,
}

impl GradleProcessConnection {
    fn operation(&self, mode: Mode) -> Box<dyn EngineOperation> {
        Box::new(GradleProcess {
            project_dir: self.project_dir.clone(),
            executable: self.executable.clone(),
            mode,
            tasks: Vec::new(),
            arguments: Vec::new(),
            jvm_arguments: Vec::new(),
            stdout: None,
            stderr: None,
            listeners: Vec::new(),
        })
    }
}

fn unsupported_action() -> EngineFailure {
    EngineFailure::new(
        "UnsupportedOperationException",
        "Build actions require an in-process tooling client; the command-line engine cannot run them",
    )
}

impl EngineConnection for GradleProcessConnection {
    fn new_build(&self) -> Result<Box<dyn EngineOperation>, EngineFailure> {
        Ok(self.operation(Mode::Build))
    }

    fn new_test_launcher(&self) -> Result<Box<dyn EngineOperation>, EngineFailure> {
        Ok(self.operation(Mode::Test))
    }

    fn model(&self, model_type: &str) -> Result<Box<dyn EngineOperation>, EngineFailure> {
        if model_type == BUILD_ENVIRONMENT_MODEL {
            Ok(self.operation(Mode::Environment))
        } else {
            Err(EngineFailure::new(
                "UnknownModelException",
                format!("The command-line engine cannot build the model '{model_type}'"),
            ))
        }
    }

    fn action(&self, _action: &serde_json::Value) -> Result<Box<dyn EngineOperation>, EngineFailure> {
        Err(unsupported_action())
    }

    fn phased_action(
        &self,
        _projects_loaded_action: &serde_json::Value,
        _on_projects_loaded: IntermediateHandler,
        _build_finished_action: &serde_json::Value,
    ) -> Result<Box<dyn EngineOperation>, EngineFailure> {
        Err(unsupported_action())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Build,
    Test,
    Environment,
}

struct GradleProcess {
    project_dir: PathBuf,
    executable: PathBuf,
    mode: Mode,
    tasks: Vec<String>,
    arguments: Vec<String>,
    jvm_arguments: Vec<String>,
    stdout: Option<OutputSink>,
    stderr: Option<OutputSink>,
    listeners: Vec<(ProgressListener, Option<BTreeSet<OperationType>>)>,
}

impl GradleProcess {
    /// Arguments passed to the Gradle executable
    fn command_line(&self) -> Vec<String> {
        let mut argv = vec!["--console=plain".to_string()];
        if self.mode == Mode::Environment {
            argv.push("--version".to_string());
            return argv;
        }
        argv.extend(self.arguments.iter().cloned());
        if !self.jvm_arguments.is_empty() {
            argv.push(format!("-Dorg.gradle.jvmargs={}", self.jvm_arguments.join(" ")));
        }
        match self.mode {
            Mode::Test => argv.push("test".to_string()),
            _ => argv.extend(self.tasks.iter().cloned()),
        }
        argv
    }
}

impl EngineOperation for GradleProcess {
    fn for_tasks(&mut self, tasks: &[String]) {
        self.tasks = tasks.to_vec();
    }

    fn with_arguments(&mut self, arguments: &[String]) {
        self.arguments = arguments.to_vec();
    }

    fn set_jvm_arguments(&mut self, jvm_arguments: &[String]) {
        self.jvm_arguments = jvm_arguments.to_vec();
    }

    fn set_standard_output(&mut self, sink: OutputSink) {
        self.stdout = Some(sink);
    }

    fn set_standard_error(&mut self, sink: OutputSink) {
        self.stderr = Some(sink);
    }

    fn add_progress_listener(
        &mut self,
        listener: ProgressListener,
        operation_types: Option<BTreeSet<OperationType>>,
    ) {
        self.listeners.push((listener, operation_types));
    }

    fn run(self: Box<Self>) -> Result<EngineResult, EngineFailure> {
        let argv = self.command_line();
        let GradleProcess { project_dir, executable, mode, jvm_arguments, stdout, stderr, listeners, .. } =
            *self;

        tracing::info!(
            executable = %executable.display(),
            args = ?argv,
            cwd = %project_dir.display(),
            "running gradle"
        );

        let mut child = Command::new(&executable)
            .args(&argv)
            .current_dir(&project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EngineFailure::new(
                    "GradleConnectionException",
                    format!("Could not start '{}'", executable.display()),
                )
                .with_cause(EngineFailure::from_io(&e))
            })?;

        let out_pipe = child.stdout.take();
        let err_pipe = child.stderr.take();
        let scanner = ConsoleScanner::new(&listeners);

        let (stdout_text, stderr_text) = std::thread::scope(|scope| {
            let err_thread = scope.spawn(move || {
                let mut lines = LineBuffer::keeping(STDERR_TAIL_LINES);
                if let Some(pipe) = err_pipe {
                    pump(pipe, stderr, |chunk| {
                        lines.push(chunk);
                    });
                }
                lines.into_text()
            });

            // Only the version report is read back from stdout
            let keep = if matches!(mode, Mode::Environment) { usize::MAX } else { 0 };
            let mut lines = LineBuffer::keeping(keep);
            if let Some(pipe) = out_pipe {
                pump(pipe, stdout, |chunk| {
                    for line in lines.push(chunk) {
                        scanner.line(&line);
                    }
                });
            }
            if let Some(rest) = lines.flush() {
                scanner.line(&rest);
            }
            (lines.into_text(), err_thread.join().unwrap_or_default())
        });

        let status = child.wait().map_err(|e| {
            EngineFailure::new("GradleConnectionException", "Lost track of the gradle process")
                .with_cause(EngineFailure::from_io(&e))
        })?;
        tracing::debug!(%status, "gradle exited");

        if !status.success() {
            return Err(build_failure(&status.to_string(), &stderr_text));
        }

        match mode {
            Mode::Build | Mode::Test => Ok(EngineResult::Value(serde_json::Value::Null)),
            Mode::Environment => {
                let version = parse_gradle_version(&stdout_text).ok_or_else(|| {
                    EngineFailure::new(
                        "GradleConnectionException",
                        "Could not determine the Gradle version from `gradle --version`",
                    )
                })?;
                Ok(EngineResult::Environment(Box::new(CommandLineEnvironment::detect(
                    project_dir,
                    jvm_arguments,
                    version,
                ))))
            }
        }
    }
}

/// Copy `pipe` into `sink` chunk by chunk, also handing each chunk to `observe`
fn pump(mut pipe: impl Read, mut sink: Option<OutputSink>, mut observe: impl FnMut(&[u8])) {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match pipe.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if let Some(sink) = sink.as_mut() {
                    sink(&buf[..n]);
                }
                observe(&buf[..n]);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "failed reading gradle output");
                break;
            }
        }
    }
}

/// Splits a byte stream into lines, keeping only the most recent ones
struct LineBuffer {
    pending: Vec<u8>,
    kept: VecDeque<String>,
    keep: usize,
}

impl LineBuffer {
    /// Buffer retaining at most `keep` completed lines
    fn keeping(keep: usize) -> Self {
        Self { pending: Vec::new(), kept: VecDeque::new(), keep }
    }

    /// Feed a chunk, returning the lines it completed
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim_end_matches(['\r', '\n']).to_string();
            self.keep_line(&line);
            lines.push(line);
        }
        lines
    }

    /// Trailing text without a newline, if any
    fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).trim_end_matches('\r').to_string();
        self.pending.clear();
        self.keep_line(&line);
        Some(line)
    }

    fn keep_line(&mut self, line: &str) {
        if self.keep == 0 {
            return;
        }
        if self.kept.len() == self.keep {
            self.kept.pop_front();
        }
        self.kept.push_back(line.to_string());
    }

    fn into_text(mut self) -> String {
        self.flush();
        self.kept.into_iter().fold(String::new(), |mut text, line| {
            text.push_str(&line);
            text.push('\n');
            text
        })
    }
}

/// Turns plain-console lines into progress events
struct ConsoleScanner<'a> {
    listeners: &'a [(ProgressListener, Option<BTreeSet<OperationType>>)],
}

impl<'a> ConsoleScanner<'a> {
    fn new(listeners: &'a [(ProgressListener, Option<BTreeSet<OperationType>>)]) -> Self {
        Self { listeners }
    }

    fn line(&self, line: &str) {
        if let Some(event) = parse_console_line(line) {
            for (listener, filter) in self.listeners {
                if accepts(filter.as_ref(), event.operation_type) {
                    listener(&event);
                }
            }
        }
    }
}

/// Progress event for a recognised plain-console line
fn parse_console_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim_end();
    if let Some(rest) = line.strip_prefix("> Task ") {
        let mut parts = rest.split_whitespace();
        let path = parts.next()?;
        let display = format!("Task {path}");
        let event = match parts.next() {
            None => ProgressEvent::started(OperationType::Task, path, &display),
            Some("FAILED") => ProgressEvent::finished(
                OperationType::Task,
                path,
                &display,
                OperationResult::Failure(format!("Task {path} failed")),
            ),
            Some("FROM-CACHE") => {
                ProgressEvent::finished(OperationType::Task, path, &display, OperationResult::Success)
            }
            Some(_) => {
                ProgressEvent::finished(OperationType::Task, path, &display, OperationResult::Skipped)
            }
        };
        return Some(event.with_description(line.trim_start_matches("> ")));
    }
    if let Some(project) = line.strip_prefix("> Configure project ") {
        let project = project.trim();
        let display = format!("Configure project {project}");
        return Some(ProgressEvent::started(OperationType::ProjectConfiguration, project, &display));
    }
    if line.starts_with("BUILD SUCCESSFUL") {
        return Some(
            ProgressEvent::finished(OperationType::BuildPhase, "build", "Build", OperationResult::Success)
                .with_description(line),
        );
    }
    if line.starts_with("BUILD FAILED") {
        return Some(
            ProgressEvent::finished(
                OperationType::BuildPhase,
                "build",
                "Build",
                OperationResult::Failure(line.to_string()),
            )
            .with_description(line),
        );
    }
    None
}

/// Failure chain from a non-zero exit, nesting the causes Gradle printed
/// under `* What went wrong:`
fn build_failure(status: &str, stderr: &str) -> EngineFailure {
    let mut failure =
        EngineFailure::new("BuildException", format!("Gradle build failed ({status})"));

    let mut lines = stderr.lines().skip_while(|line| line.trim() != "* What went wrong:").skip(1);
    if let Some(headline) = lines.next().map(str::trim).filter(|l| !l.is_empty()) {
        failure = failure.with_cause(EngineFailure::new("GradleException", headline));
        for line in lines.take_while(|line| !line.trim().is_empty()) {
            if let Some(cause) = line.trim().strip_prefix("> ") {
                failure = failure.with_cause(EngineFailure::new("GradleException", cause));
            }
        }
    }
    failure
}

/// Version from the `Gradle 8.5` line of `gradle --version`
fn parse_gradle_version(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Gradle "))
        .map(|version| version.trim().to_string())
        .filter(|version| !version.is_empty())
}

/// Environment reported by the command-line engine
#[derive(Debug, Clone)]
struct CommandLineEnvironment {
    root_dir: PathBuf,
    java_home: PathBuf,
    jvm_arguments: Vec<String>,
    user_home: PathBuf,
    version: String,
}

impl CommandLineEnvironment {
    fn detect(root_dir: PathBuf, jvm_arguments: Vec<String>, version: String) -> Self {
        let java_home = std::env::var_os("JAVA_HOME").map(PathBuf::from).unwrap_or_default();
        if java_home.as_os_str().is_empty() {
            tracing::warn!("JAVA_HOME is not set; reporting an empty java home");
        } else {
            let probe = jdk::probe(&java_home, jdk::PROBE_TIMEOUT);
            if !probe.alive {
                tracing::warn!(java_home = %java_home.display(), "JAVA_HOME does not point to a working JDK");
            } else if let Some(v) = probe.version.as_deref().filter(|v| !jdk::is_supported(v)) {
                tracing::warn!(java_home = %java_home.display(), version = v, "JDK is older than supported");
            }
        }

        let user_home = std::env::var_os("GRADLE_USER_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".gradle")))
            .unwrap_or_default();

        Self { root_dir, java_home, jvm_arguments, user_home, version }
    }
}

impl BuildEnvironment for CommandLineEnvironment {
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

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
