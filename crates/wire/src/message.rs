// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use crate::{BuildEvent, FailureChain, OperationDescriptor, OutcomePayload};

/// Message from the IDE to the proxy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// The operation to run; must be the first message of a session
    BuildParameters { parameters: OperationDescriptor },

    /// Acknowledges the terminal message; the proxy exits after this
    ResultAck,
}

/// Message from the proxy to the IDE
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Chunk written by the build to its standard output
    StandardOutput {
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },

    /// Chunk written by the build to its standard error
    StandardError {
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },

    /// Progress event or plain description
    BuildEvent { event: BuildEvent },

    /// Terminal: the operation completed
    Success { payload: OutcomePayload },

    /// Terminal: the operation failed
    Failure { failure: FailureChain },
}

impl ServerMessage {
    /// Whether this message ends the session's result stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerMessage::Success { .. } | ServerMessage::Failure { .. })
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ServerMessage::StandardOutput { .. } => "StandardOutput",
            ServerMessage::StandardError { .. } => "StandardError",
            ServerMessage::BuildEvent { .. } => "BuildEvent",
            ServerMessage::Success { .. } => "Success",
            ServerMessage::Failure { .. } => "Failure",
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
