// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine callbacks that forward output and progress to the peer.
//!
//! Every sink and listener only queues a message on the session's outbound
//! channel, so they are safe to call from any engine thread.

use std::sync::Arc;

use tp_engine::{OutputSink, ProgressEvent, ProgressListener};
use tp_wire::{BuildEvent, ServerMessage};

use crate::convert::convert_event;
use crate::session::Outbound;

#[derive(Clone)]
pub struct EventRelay {
    outbound: Outbound,
}

impl EventRelay {
    pub fn new(outbound: Outbound) -> Self {
        Self { outbound }
    }

    /// Forwards each chunk as a `StandardOutput` message
    pub fn stdout_sink(&self) -> OutputSink {
        let outbound = self.outbound.clone();
        Box::new(move |chunk: &[u8]| {
            outbound.dispatch(ServerMessage::StandardOutput { bytes: chunk.to_vec() });
        })
    }

    /// Forwards each chunk as a `StandardError` message
    pub fn stderr_sink(&self) -> OutputSink {
        let outbound = self.outbound.clone();
        Box::new(move |chunk: &[u8]| {
            outbound.dispatch(ServerMessage::StandardError { bytes: chunk.to_vec() });
        })
    }

    /// Forwards each event in its structured form
    pub fn progress_listener(&self) -> ProgressListener {
        let outbound = self.outbound.clone();
        Arc::new(move |event: &ProgressEvent| {
            let event = BuildEvent::Progress(convert_event(event));
            outbound.dispatch(ServerMessage::BuildEvent { event });
        })
    }

    /// Forwards the description of each event that has one
    pub fn description_listener(&self) -> ProgressListener {
        let outbound = self.outbound.clone();
        Arc::new(move |event: &ProgressEvent| {
            if event.description.is_empty() {
                return;
            }
            let event = BuildEvent::Description { text: event.description.clone() };
            outbound.dispatch(ServerMessage::BuildEvent { event });
        })
    }
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
