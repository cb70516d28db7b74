// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener for the single IDE connection.
//!
//! Binds an ephemeral port, accepts exactly one connection, hands it to the
//! session and stops accepting.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::lifecycle::ProxyError;
use crate::session::Session;

/// Address the IDE connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

fn default_bind_address(local: bool) -> IpAddr {
    if local {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    }
}

/// Addresses assigned to this machine's network interfaces
fn interface_addresses() -> Vec<IpAddr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces.iter().map(|iface| iface.ip()).collect(),
        Err(e) => {
            warn!(error = %e, "cannot list network interfaces");
            Vec::new()
        }
    }
}

/// Resolve the bind hint to an address of this machine.
///
/// Accepts an IP literal or a host name (IPv4 results preferred) that names
/// one of the local interfaces. Without a hint, or when it does not resolve
/// to a local address, falls back to loopback for a co-located IDE and to
/// the wildcard address otherwise.
pub async fn resolve_bind_address(hint: Option<&str>, local: bool) -> IpAddr {
    let Some(hint) = hint else {
        return default_bind_address(local);
    };
    let candidates: Vec<IpAddr> = match hint.parse::<IpAddr>() {
        Ok(ip) => vec![ip],
        Err(_) => match tokio::net::lookup_host((hint, 0)).await {
            Ok(addrs) => addrs.map(|addr| addr.ip()).collect(),
            Err(e) => {
                warn!(host = hint, error = %e, "cannot resolve bind host, using default");
                return default_bind_address(local);
            }
        },
    };

    let interfaces = interface_addresses();
    let on_this_machine: Vec<IpAddr> = candidates
        .into_iter()
        .filter(|ip| ip.is_unspecified() || ip.is_loopback() || interfaces.contains(ip))
        .collect();
    match on_this_machine.iter().find(|ip| ip.is_ipv4()).or_else(|| on_this_machine.first()) {
        Some(ip) => *ip,
        None => {
            warn!(host = hint, "bind host is not an address of this machine, using default");
            default_bind_address(local)
        }
    }
}

/// Host to announce for a listener bound to `bound`.
///
/// A wildcard bind is announced as a concrete interface address, preferring
/// a non-loopback IPv4 one.
fn announced_host(bound: IpAddr) -> String {
    if !bound.is_unspecified() {
        return bound.to_string();
    }
    let interfaces = interface_addresses();
    interfaces
        .iter()
        .find(|ip| ip.is_ipv4() && !ip.is_loopback())
        .or_else(|| interfaces.iter().find(|ip| !ip.is_loopback()))
        .copied()
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .to_string()
}

/// Accepts one connection on an ephemeral port
pub struct Listener {
    endpoint: Endpoint,
    accept: Mutex<Option<JoinHandle<()>>>,
}

impl Listener {
    /// Bind and start accepting in the background
    pub async fn start(
        bind_hint: Option<&str>,
        local: bool,
        session: Arc<Session>,
    ) -> Result<Listener, ProxyError> {
        let ip = resolve_bind_address(bind_hint, local).await;
        let addr = SocketAddr::new(ip, 0);
        let listener =
            TcpListener::bind(addr).await.map_err(|source| ProxyError::Bind { addr, source })?;
        let bound = listener.local_addr().map_err(|source| ProxyError::Bind { addr, source })?;
        let endpoint = Endpoint { host: announced_host(bound.ip()), port: bound.port() };
        info!(%endpoint, bound = %bound, "listening for the IDE connection");

        let accept = tokio::spawn(accept_one(listener, session));
        Ok(Listener { endpoint, accept: Mutex::new(Some(accept)) })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Stop accepting and release the port.
    ///
    /// Returns whether this call did the stopping.
    pub fn stop(&self) -> bool {
        match self.accept.lock().take() {
            Some(accept) => {
                accept.abort();
                debug!(endpoint = %self.endpoint, "listener stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn accept_one(listener: TcpListener, session: Arc<Session>) {
    match listener.accept().await {
        Ok((stream, peer)) => {
            info!(%peer, "IDE connected");
            if let Err(e) = stream.set_nodelay(true) {
                debug!(error = %e, "failed to set TCP_NODELAY");
            }
            let (reader, writer) = stream.into_split();
            session.attach(reader, writer);
        }
        Err(e) => error!(error = %e, "accept failed"),
    }
    // Dropping the listener here stops further connections
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
