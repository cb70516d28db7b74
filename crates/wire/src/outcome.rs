// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal payloads: normalized results and failure chains.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result carried by a `Success` message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OutcomePayload {
    /// Opaque value produced by the engine
    Value(serde_json::Value),

    /// Build environment, copied out of the engine into plain fields
    Environment(EnvironmentRecord),
}

/// Build environment with no engine handles attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentRecord {
    pub root_directory: PathBuf,
    pub java_home: PathBuf,
    pub jvm_arguments: Vec<String>,
    pub build_tool_user_home: PathBuf,
    pub build_tool_version: String,
}

/// One link of a failure's cause chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureCause {
    /// Error type name as reported by the engine (e.g. `BuildException`)
    pub kind: String,
    pub message: String,
}

/// Full cause chain of a failed operation, outermost first
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureChain {
    pub causes: Vec<FailureCause>,
}

impl FailureChain {
    pub fn new(causes: Vec<FailureCause>) -> Self {
        Self { causes }
    }

    pub fn depth(&self) -> usize {
        self.causes.len()
    }

    /// The outermost failure
    pub fn head(&self) -> Option<&FailureCause> {
        self.causes.first()
    }

    /// The innermost cause
    pub fn root_cause(&self) -> Option<&FailureCause> {
        self.causes.last()
    }
}

impl std::fmt::Display for FailureChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, cause) in self.causes.iter().enumerate() {
            if i > 0 {
                write!(f, "\nCaused by: ")?;
            }
            write!(f, "{}: {}", cause.kind, cause.message)?;
        }
        Ok(())
    }
}
