// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tp-engine: build engine capabilities used by the tooling proxy

mod event;
mod failure;
pub mod jdk;
mod operation;
mod process;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use event::{EventPhase, OperationInfo, OperationResult, OperationType, ProgressEvent};
pub use failure::EngineFailure;
pub use operation::{
    accepts, BuildEnvironment, EngineConnection, EngineConnector, EngineOperation, EngineResult,
    IntermediateHandler, OutputSink, ProgressListener,
};
pub use process::GradleProcessConnector;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCall, FakeEngine, FakeEnvironment, FakeOutcome};
