// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded polling for the startup handshake.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::lifecycle::ProxyError;

/// What a startup wait is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStage {
    Connection,
    Parameters,
}

impl fmt::Display for WaitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitStage::Connection => write!(f, "incoming connection"),
            WaitStage::Parameters => write!(f, "build parameters"),
        }
    }
}

/// Poll `ready` every `poll` until it holds, failing once `deadline` has
/// elapsed without it holding.
pub async fn wait_for(
    stage: WaitStage,
    deadline: Duration,
    poll: Duration,
    mut ready: impl FnMut() -> bool,
) -> Result<(), ProxyError> {
    let started = Instant::now();
    loop {
        if ready() {
            return Ok(());
        }
        if started.elapsed() >= deadline {
            return Err(ProxyError::Timeout { stage, after: deadline });
        }
        tracing::debug!(%stage, "waiting");
        tokio::time::sleep(poll).await;
    }
}

#[cfg(test)]
#[path = "wait_tests.rs"]
mod tests;
