// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tp-proxy: single-shot server between an IDE and the build engine
//!
//! The proxy binds an ephemeral port, accepts one IDE connection, reads the
//! build parameters, runs the requested operation while relaying output and
//! progress, and finishes with exactly one terminal message.

mod convert;
mod dispatch;
pub mod env;
mod lifecycle;
mod listener;
pub mod logging;
mod relay;
mod session;
mod wait;

#[cfg(test)]
mod test_support;

pub use convert::{convert_event, failure_chain, normalize};
pub use dispatch::{execute, run_operation};
pub use lifecycle::{Config, Proxy, ProxyError};
pub use listener::{resolve_bind_address, Endpoint, Listener};
pub use logging::LogLevel;
pub use relay::EventRelay;
pub use session::{AckOutcome, ConnectionState, Outbound, Session, SessionError};
pub use wait::{wait_for, WaitStage};
