// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers for driving the proxy binary like an IDE would.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::Duration;

pub use serde_json::json;
pub use tp_wire::{ClientMessage, Operation, OperationDescriptor, ServerMessage};

const ANNOUNCEMENT: &str = "Gradle target server hostName: ";

pub fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tooling-proxy"))
}

/// Builder for one proxy process
pub struct ProxyCmd {
    command: Command,
}

/// Start configuring a proxy bound to loopback
pub fn proxy() -> ProxyCmd {
    let mut command = Command::new(binary());
    command
        .env("targetHost", "127.0.0.1")
        .env_remove("TOOLING_PROXY_WAIT_TIMEOUT_MS")
        .env_remove("TOOLING_PROXY_POLL_INTERVAL_MS")
        .env_remove("TOOLING_PROXY_GRADLE")
        .env_remove("RUST_LOG");
    ProxyCmd { command }
}

impl ProxyCmd {
    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.command.env(key, value);
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.command.arg(arg);
        self
    }

    pub fn project(self, dir: &Path) -> Self {
        self.env("TOOLING_PROXY_PROJECT_DIR", dir)
    }

    pub fn wait_timeout_ms(self, ms: u64) -> Self {
        self.env("TOOLING_PROXY_WAIT_TIMEOUT_MS", ms.to_string())
    }

    /// Spawn and read the announcement line
    pub fn start(mut self) -> Running {
        let mut child = self
            .command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn tooling-proxy");
        let mut stdout = BufReader::new(child.stdout.take().unwrap());
        let mut line = String::new();
        stdout.read_line(&mut line).unwrap();
        let announced = line.trim_end().to_string();
        let port = announced
            .strip_prefix(ANNOUNCEMENT)
            .and_then(|rest| rest.rsplit_once(" port: "))
            .and_then(|(_, port)| port.parse().ok())
            .unwrap_or_else(|| panic!("unexpected announcement: {announced:?}"));
        Running { child, stdout, announced, port }
    }
}

/// A started proxy
pub struct Running {
    child: Child,
    stdout: BufReader<ChildStdout>,
    pub announced: String,
    pub port: u16,
}

impl Running {
    pub fn connect(&self) -> Peer {
        let stream = TcpStream::connect(("127.0.0.1", self.port)).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(30))).unwrap();
        Peer { stream }
    }

    /// Wait for exit
    pub fn finish(mut self) -> Finished {
        let status = self.child.wait().unwrap();
        let mut stdout = String::new();
        self.stdout.read_to_string(&mut stdout).unwrap();
        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            pipe.read_to_string(&mut stderr).unwrap();
        }
        Finished { code: status.code(), stdout, stderr }
    }
}

pub struct Finished {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Finished {
    pub fn passes(self) -> Self {
        assert_eq!(self.code, Some(0), "expected success\nstderr:\n{}", self.stderr);
        self
    }

    pub fn fails(self) -> Self {
        assert_eq!(self.code, Some(1), "expected exit code 1\nstderr:\n{}", self.stderr);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr lacks {needle:?}:\n{}", self.stderr);
        self
    }

    /// Nothing but the announcement is written to stdout
    pub fn stdout_is_quiet(self) -> Self {
        assert!(self.stdout.trim().is_empty(), "unexpected stdout:\n{}", self.stdout);
        self
    }
}

/// IDE side of the connection, speaking length-prefixed JSON frames
pub struct Peer {
    stream: TcpStream,
}

impl Peer {
    pub fn send(&mut self, message: &ClientMessage) {
        let body = tp_wire::encode(message).unwrap();
        self.send_raw(&body);
    }

    pub fn send_raw(&mut self, body: &[u8]) {
        let len = u32::try_from(body.len()).unwrap();
        self.stream.write_all(&len.to_be_bytes()).unwrap();
        self.stream.write_all(body).unwrap();
        self.stream.flush().unwrap();
    }

    pub fn send_parameters(&mut self, parameters: OperationDescriptor) {
        self.send(&ClientMessage::BuildParameters { parameters });
    }

    pub fn ack(&mut self) {
        self.send(&ClientMessage::ResultAck);
    }

    /// Next message, or `None` once the proxy closed the connection
    pub fn recv(&mut self) -> Option<ServerMessage> {
        let mut len = [0u8; 4];
        match self.stream.read_exact(&mut len) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return None,
            Err(e) => panic!("read failed: {e}"),
        }
        let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
        self.stream.read_exact(&mut body).unwrap();
        Some(tp_wire::decode(&body).unwrap())
    }

    /// Every message up to and including the terminal one
    pub fn recv_until_terminal(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Some(message) = self.recv() {
            let terminal = message.is_terminal();
            messages.push(message);
            if terminal {
                break;
            }
        }
        messages
    }
}

/// Project directory holding a `gradlew` that runs `script`
#[cfg(unix)]
pub fn project_with_wrapper(script: &str) -> tempfile::TempDir {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let wrapper = dir.path().join("gradlew");
    std::fs::write(&wrapper, format!("#!/bin/sh\n{script}\n")).unwrap();
    std::fs::set_permissions(&wrapper, std::fs::Permissions::from_mode(0o755)).unwrap();
    dir
}
