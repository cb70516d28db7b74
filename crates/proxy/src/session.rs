// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single peer connection.
//!
//! A session owns the accepted socket. One reader task decodes inbound frames
//! (the build parameters, then the acknowledgement) and one writer task drains
//! the outbound queue, so frames from concurrent producers never interleave.
//! Queueing the terminal message closes the queue: it is always the last
//! frame written and every later `dispatch` is a no-op.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Notify};
use tp_wire::{
    ClientMessage, FailureCause, FailureChain, OperationDescriptor, ProtocolError, ServerMessage,
};
use tracing::{debug, info, trace, warn};

/// Session progress; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    Listening,
    Connected,
    /// Reader is waiting for the first frame
    AwaitingParameters,
    ParametersReceived,
    ResultSent,
    AckReceived,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("no peer is connected")]
    NotConnected,

    #[error("the result was already sent")]
    ResultAlreadySent,

    #[error("transport error: {0}")]
    Transport(String),
}

/// How waiting for the peer's acknowledgement ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    Received,
    /// Peer went away without acknowledging
    PeerClosed,
    Failed(String),
}

pub(crate) struct OutboundFrame {
    pub(crate) message: ServerMessage,
    /// Resolved once the frame is written; only set for the terminal message
    pub(crate) written: Option<oneshot::Sender<Result<(), SessionError>>>,
}

/// Cloneable, thread-safe handle for queueing messages to the peer
#[derive(Clone)]
pub struct Outbound {
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<OutboundFrame>>>>,
}

impl Outbound {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: Arc::new(Mutex::new(Some(tx))) }, rx)
    }

    /// Queue a non-terminal message.
    ///
    /// Returns false when the message was dropped: it was terminal, the
    /// result was already sent, or the writer is gone.
    pub fn dispatch(&self, message: ServerMessage) -> bool {
        if message.is_terminal() {
            warn!(message = message.name(), "terminal message passed to dispatch, dropping it");
            return false;
        }
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(tx) => tx.send(OutboundFrame { message, written: None }).is_ok(),
            None => {
                trace!(message = message.name(), "result already sent, dropping message");
                false
            }
        }
    }

    /// Whether the terminal message has been queued
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Queue `message` as the last frame and close the queue
    pub(crate) fn finish(
        &self,
        message: ServerMessage,
    ) -> Result<oneshot::Receiver<Result<(), SessionError>>, SessionError> {
        let sender = self.sender.lock().take().ok_or(SessionError::ResultAlreadySent)?;
        let (tx, rx) = oneshot::channel();
        sender
            .send(OutboundFrame { message, written: Some(tx) })
            .map_err(|_| SessionError::Transport("writer stopped".to_string()))?;
        Ok(rx)
    }
}

enum DescriptorSlot {
    Pending,
    Ready(Result<OperationDescriptor, SessionError>),
    Taken,
}

/// State shared by the listener, the dispatcher, the relay and the entry point
pub struct Session {
    state: Mutex<ConnectionState>,
    outbound: Outbound,
    frames: Mutex<Option<mpsc::UnboundedReceiver<OutboundFrame>>>,
    descriptor: Mutex<DescriptorSlot>,
    descriptor_ready: Notify,
    ack: Mutex<Option<oneshot::Receiver<AckOutcome>>>,
}

impl Session {
    pub fn new() -> Arc<Self> {
        let (outbound, frames) = Outbound::channel();
        Arc::new(Self {
            state: Mutex::new(ConnectionState::Listening),
            outbound,
            frames: Mutex::new(Some(frames)),
            descriptor: Mutex::new(DescriptorSlot::Pending),
            descriptor_ready: Notify::new(),
            ack: Mutex::new(None),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn advance(&self, next: ConnectionState) {
        let mut state = self.state.lock();
        if next > *state {
            debug!(from = ?*state, to = ?next, "session state");
            *state = next;
        } else if next < *state {
            trace!(current = ?*state, ignored = ?next, "ignoring backward session transition");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() >= ConnectionState::Connected
    }

    pub fn is_parameters_received(&self) -> bool {
        self.state() >= ConnectionState::ParametersReceived
    }

    /// Whether `receive_descriptor` would return without waiting
    pub fn is_descriptor_settled(&self) -> bool {
        !matches!(*self.descriptor.lock(), DescriptorSlot::Pending)
    }

    pub fn outbound(&self) -> Outbound {
        self.outbound.clone()
    }

    /// Take over an accepted connection, starting its reader and writer.
    ///
    /// Returns false if the session already has a peer.
    pub fn attach<R, W>(self: &Arc<Self>, reader: R, writer: W) -> bool
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Some(frames) = self.frames.lock().take() else {
            warn!("session already has a peer, refusing another connection");
            return false;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        *self.ack.lock() = Some(ack_rx);
        self.advance(ConnectionState::Connected);

        tokio::spawn(write_frames(writer, frames));
        tokio::spawn(read_frames(Arc::clone(self), reader, ack_tx));
        true
    }

    fn settle_descriptor(&self, result: Result<OperationDescriptor, SessionError>) {
        *self.descriptor.lock() = DescriptorSlot::Ready(result);
        self.descriptor_ready.notify_one();
    }

    /// Wait for the build parameters sent as the first frame.
    ///
    /// Fails with `SessionError::Protocol` when that frame is malformed, is
    /// not a parameters message, or the peer closed first.
    pub async fn receive_descriptor(&self) -> Result<OperationDescriptor, SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        loop {
            let notified = self.descriptor_ready.notified();
            {
                let mut slot = self.descriptor.lock();
                match std::mem::replace(&mut *slot, DescriptorSlot::Taken) {
                    DescriptorSlot::Ready(result) => return result,
                    DescriptorSlot::Taken => {
                        return Err(SessionError::Protocol(
                            "build parameters were already consumed".to_string(),
                        ))
                    }
                    DescriptorSlot::Pending => *slot = DescriptorSlot::Pending,
                }
            }
            notified.await;
        }
    }

    /// Send the terminal message and wait until it is written.
    ///
    /// Succeeds at most once per session.
    pub async fn send_result(&self, message: ServerMessage) -> Result<(), SessionError> {
        if !message.is_terminal() {
            return Err(SessionError::Protocol(format!(
                "{} is not a terminal message",
                message.name()
            )));
        }
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }

        let name = message.name();
        let written = self.outbound.finish(message)?;
        match written.await {
            Ok(Ok(())) => {
                self.advance(ConnectionState::ResultSent);
                info!(result = name, "result sent");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SessionError::Transport(
                "writer stopped before the result was written".to_string(),
            )),
        }
    }

    /// Wait for the peer to acknowledge the result or go away
    pub async fn await_ack(&self) -> AckOutcome {
        let pending = self.ack.lock().take();
        let outcome = match pending {
            Some(rx) => rx.await.unwrap_or(AckOutcome::PeerClosed),
            None => AckOutcome::PeerClosed,
        };
        match &outcome {
            AckOutcome::Received => {
                self.advance(ConnectionState::AckReceived);
                info!("result acknowledged");
            }
            AckOutcome::PeerClosed => warn!("peer closed the connection without acknowledging"),
            AckOutcome::Failed(e) => warn!(error = %e, "failed waiting for acknowledgement"),
        }
        outcome
    }
}

async fn read_frames<R>(session: Arc<Session>, mut reader: R, ack: oneshot::Sender<AckOutcome>)
where
    R: AsyncRead + Unpin,
{
    session.advance(ConnectionState::AwaitingParameters);

    let first = match tp_wire::read_client_message(&mut reader).await {
        Ok(ClientMessage::BuildParameters { parameters }) => {
            info!(
                operation = parameters.operation.name(),
                tasks = ?parameters.operation.requested_tasks(),
                "build parameters received"
            );
            session.advance(ConnectionState::ParametersReceived);
            Ok(parameters)
        }
        Ok(ClientMessage::ResultAck) => {
            Err(SessionError::Protocol("expected build parameters, got ResultAck".to_string()))
        }
        Err(ProtocolError::ConnectionClosed) => Err(SessionError::Protocol(
            "peer closed the connection before sending build parameters".to_string(),
        )),
        Err(e) => Err(SessionError::Protocol(e.to_string())),
    };
    let accepted = first.is_ok();
    session.settle_descriptor(first);
    if !accepted {
        return;
    }

    let outcome = loop {
        match tp_wire::read_client_message(&mut reader).await {
            Ok(ClientMessage::ResultAck) => break AckOutcome::Received,
            Ok(ClientMessage::BuildParameters { .. }) => {
                warn!("ignoring additional build parameters");
            }
            Err(ProtocolError::ConnectionClosed) => break AckOutcome::PeerClosed,
            Err(e) => break AckOutcome::Failed(e.to_string()),
        }
    };
    let _ = ack.send(outcome);
}

async fn write_frames<W>(mut writer: W, mut frames: mpsc::UnboundedReceiver<OutboundFrame>)
where
    W: AsyncWrite + Unpin,
{
    // After the first failed write the rest are reported, not attempted
    let mut broken: Option<String> = None;
    while let Some(OutboundFrame { message, written }) = frames.recv().await {
        let result = match broken.clone() {
            Some(reason) => Err(SessionError::Transport(reason)),
            None => match encode_frame(&message) {
                Ok(body) => {
                    let sent = tp_wire::write_message(&mut writer, &body).await;
                    sent.map_err(|e| {
                        warn!(message = message.name(), error = %e, "failed to write to peer");
                        let reason = e.to_string();
                        broken = Some(reason.clone());
                        SessionError::Transport(reason)
                    })
                }
                // Nothing reached the socket, so the stream stays usable
                Err(e) => Err(e),
            },
        };
        if let Some(done) = written {
            let _ = done.send(result);
        }
    }
    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "failed to shut down connection");
    }
}

/// Frame body for `message`.
///
/// A terminal message that cannot be encoded is replaced by a `Failure`
/// describing why, so the peer still gets a terminal frame.
fn encode_frame(message: &ServerMessage) -> Result<Vec<u8>, SessionError> {
    let err = match tp_wire::encode_server_message(message) {
        Ok(body) => return Ok(body),
        Err(e) => e,
    };
    if !message.is_terminal() {
        warn!(message = message.name(), error = %err, "dropping message that cannot be encoded");
        return Err(SessionError::Protocol(err.to_string()));
    }

    warn!(result = message.name(), error = %err, "result cannot be encoded, sending a failure");
    let failure = ServerMessage::Failure {
        failure: FailureChain::new(vec![
            FailureCause {
                kind: "EncodingException".to_string(),
                message: format!("the {} result could not be encoded", message.name()),
            },
            FailureCause { kind: "ProtocolError".to_string(), message: err.to_string() },
        ]),
    };
    tp_wire::encode_server_message(&failure).map_err(|e| SessionError::Protocol(e.to_string()))
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
