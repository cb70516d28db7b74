// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the proxy crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::ProxyError;

/// Host or address to bind the listener to
pub fn target_host() -> Option<String> {
    std::env::var("targetHost").ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Whether the IDE runs on this machine (`TOOLING_PROXY_TARGET_LOCAL=1|true`).
/// Selects loopback as the default bind address.
pub fn target_local() -> bool {
    std::env::var("TOOLING_PROXY_TARGET_LOCAL")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true"))
        .unwrap_or(false)
}

/// Deadline for each startup wait (default 5s)
pub fn wait_timeout() -> Duration {
    millis("TOOLING_PROXY_WAIT_TIMEOUT_MS").unwrap_or(Duration::from_millis(5000))
}

/// Sleep between startup wait checks (default 100ms, at least 1ms)
pub fn poll_interval() -> Duration {
    millis("TOOLING_PROXY_POLL_INTERVAL_MS")
        .unwrap_or(Duration::from_millis(100))
        .max(Duration::from_millis(1))
}

/// Project to build: `TOOLING_PROXY_PROJECT_DIR` > current directory, canonicalized
pub fn project_dir() -> Result<PathBuf, ProxyError> {
    let dir = match std::env::var_os("TOOLING_PROXY_PROJECT_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::current_dir()
            .map_err(|e| ProxyError::Config(format!("cannot read current directory: {e}")))?,
    };
    dir.canonicalize()
        .map_err(|e| ProxyError::Config(format!("invalid project directory {}: {e}", dir.display())))
}

/// Gradle executable to run instead of the project wrapper
pub fn gradle_executable() -> Option<PathBuf> {
    std::env::var_os("TOOLING_PROXY_GRADLE").filter(|s| !s.is_empty()).map(PathBuf::from)
}

fn millis(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.trim().parse::<u64>().ok()).map(Duration::from_millis)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
