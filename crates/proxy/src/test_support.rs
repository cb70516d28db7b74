// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IDE-side peer for exercising the proxy over a real byte stream.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tp_wire::{
    decode, encode, read_message, write_message, ClientMessage, OperationDescriptor,
    ProtocolError, ServerMessage,
};

use crate::session::Session;

pub(crate) struct TestPeer<S> {
    stream: S,
}

impl<S: AsyncRead + AsyncWrite + Unpin> TestPeer<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self { stream }
    }

    pub(crate) async fn send(&mut self, message: &ClientMessage) {
        let body = encode(message).unwrap();
        write_message(&mut self.stream, &body).await.unwrap();
    }

    pub(crate) async fn send_raw(&mut self, body: &[u8]) {
        write_message(&mut self.stream, body).await.unwrap();
    }

    pub(crate) async fn send_parameters(&mut self, parameters: OperationDescriptor) {
        self.send(&ClientMessage::BuildParameters { parameters }).await;
    }

    pub(crate) async fn ack(&mut self) {
        self.send(&ClientMessage::ResultAck).await;
    }

    /// Next message, or `None` once the proxy closed its side
    pub(crate) async fn recv(&mut self) -> Option<ServerMessage> {
        match read_message(&mut self.stream).await {
            Ok(body) => Some(decode(&body).unwrap()),
            Err(ProtocolError::ConnectionClosed) => None,
            Err(e) => panic!("peer read failed: {e}"),
        }
    }

    /// Every message up to and including the terminal one
    pub(crate) async fn recv_until_terminal(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Some(message) = self.recv().await {
            let terminal = message.is_terminal();
            messages.push(message);
            if terminal {
                break;
            }
        }
        messages
    }

    /// Every message until the proxy closes the stream
    pub(crate) async fn recv_all(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Some(message) = self.recv().await {
            messages.push(message);
        }
        messages
    }
}

/// Session attached to one end of an in-memory pipe, with a peer on the other
pub(crate) fn attached_session() -> (Arc<Session>, TestPeer<DuplexStream>) {
    let (ours, theirs) = tokio::io::duplex(64 * 1024);
    let session = Session::new();
    let (reader, writer) = tokio::io::split(ours);
    assert!(session.attach(reader, writer));
    (session, TestPeer::new(theirs))
}

/// Stdout bytes carried by each `StandardOutput` message, in order
pub(crate) fn stdout_chunks(messages: &[ServerMessage]) -> Vec<Vec<u8>> {
    messages
        .iter()
        .filter_map(|m| match m {
            ServerMessage::StandardOutput { bytes } => Some(bytes.clone()),
            _ => None,
        })
        .collect()
}
