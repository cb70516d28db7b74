// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proxy lifecycle: bind, handshake, build, deliver, shut down.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tp_engine::EngineConnector;
use tracing::{info, warn};

use crate::dispatch::run_operation;
use crate::env;
use crate::listener::{Endpoint, Listener};
use crate::relay::EventRelay;
use crate::session::{AckOutcome, Session, SessionError};
use crate::wait::{wait_for, WaitStage};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {after:?} waiting for {stage}")]
    Timeout { stage: WaitStage, after: Duration },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Session(SessionError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<SessionError> for ProxyError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Protocol(message) => ProxyError::Protocol(message),
            other => ProxyError::Session(other),
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host or address to bind (from `targetHost`)
    pub bind_hint: Option<String>,
    /// IDE runs on this machine
    pub local: bool,
    /// Deadline for each startup wait
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    /// Project the build runs in
    pub project_dir: PathBuf,
    pub gradle_executable: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the environment
    pub fn load() -> Result<Self, ProxyError> {
        Ok(Self {
            bind_hint: env::target_host(),
            local: env::target_local(),
            wait_timeout: env::wait_timeout(),
            poll_interval: env::poll_interval(),
            project_dir: env::project_dir()?,
            gradle_executable: env::gradle_executable(),
        })
    }
}

/// A bound proxy waiting for its IDE
pub struct Proxy {
    config: Config,
    session: Arc<Session>,
    listener: Listener,
}

impl Proxy {
    /// Bind the listener; the IDE may connect as soon as this returns
    pub async fn bind(config: Config) -> Result<Self, ProxyError> {
        let session = Session::new();
        let listener =
            Listener::start(config.bind_hint.as_deref(), config.local, Arc::clone(&session))
                .await?;
        Ok(Self { config, session, listener })
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.listener.endpoint()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Run the single session to completion.
    ///
    /// Returns `Ok` once a terminal message was produced, whether or not the
    /// peer received or acknowledged it. The listener is stopped on every path.
    pub async fn serve(self, connector: Arc<dyn EngineConnector>) -> Result<(), ProxyError> {
        let result = self.run_session(connector).await;
        self.listener.stop();
        result
    }

    async fn run_session(&self, connector: Arc<dyn EngineConnector>) -> Result<(), ProxyError> {
        let (wait_timeout, poll_interval) = (self.config.wait_timeout, self.config.poll_interval);
        let session = &self.session;

        wait_for(WaitStage::Connection, wait_timeout, poll_interval, || session.is_connected())
            .await?;
        wait_for(WaitStage::Parameters, wait_timeout, poll_interval, || {
            session.is_parameters_received() || session.is_descriptor_settled()
        })
        .await?;
        let descriptor = session.receive_descriptor().await?;

        let relay = EventRelay::new(session.outbound());
        let outcome =
            run_operation(connector, self.config.project_dir.clone(), descriptor, relay).await;

        if let Err(e) = session.send_result(outcome).await {
            warn!(error = %e, "failed to deliver the result");
        }
        if session.await_ack().await == AckOutcome::Received {
            info!("session complete");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
