// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Failure raised by the build engine, with its full cause chain.
///
/// `kind` is the engine's name for the error type (e.g. `BuildException`);
/// it travels to the IDE unchanged so nested causes render as they would
/// in-process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct EngineFailure {
    kind: String,
    message: String,
    #[source]
    cause: Option<Box<EngineFailure>>,
}

impl EngineFailure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: kind.into(), message: message.into(), cause: None }
    }

    /// Wrap an I/O error as a leaf failure
    pub fn from_io(err: &std::io::Error) -> Self {
        Self::new("IOException", err.to_string())
    }

    /// Attach `cause` beneath this failure.
    ///
    /// If this failure already has a cause, `cause` is attached at the bottom
    /// of the existing chain so no link is lost.
    pub fn with_cause(mut self, cause: EngineFailure) -> Self {
        match self.cause.take() {
            None => self.cause = Some(Box::new(cause)),
            Some(existing) => self.cause = Some(Box::new(existing.with_cause(cause))),
        }
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&EngineFailure> {
        self.cause.as_deref()
    }

    /// This failure followed by each nested cause, outermost first
    pub fn chain(&self) -> impl Iterator<Item = &EngineFailure> {
        std::iter::successors(Some(self), |failure| failure.cause())
    }
}

#[cfg(test)]
#[path = "failure_tests.rs"]
mod tests;
