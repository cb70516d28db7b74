// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between the IDE and the tooling proxy.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod descriptor;
mod event;
mod message;
mod outcome;
mod wire;

pub use descriptor::{EventKind, Operation, OperationDescriptor, BUILD_ENVIRONMENT_MODEL};
pub use event::{BuildEvent, FinishResult, ProgressEvent, ProgressPhase};
pub use message::{ClientMessage, ServerMessage};
pub use outcome::{EnvironmentRecord, FailureCause, FailureChain, OutcomePayload};
pub use wire::{decode, encode, read_message, write_message, ProtocolError, MAX_MESSAGE_SIZE};
pub use wire::{encode_server_message, read_client_message, write_server_message};
