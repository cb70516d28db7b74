// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JDK liveness probing and version parsing.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

/// Upper bound for `java -version` to exit
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Oldest feature release accepted as a build runtime
pub const MIN_FEATURE_VERSION: u32 = 11;

/// Outcome of probing a JDK home
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JdkProbe {
    /// Version reported by `java -version`, if any
    pub version: Option<String>,
    /// Whether `java -version` started and exited with code 0
    pub alive: bool,
}

/// Path of the `java` launcher inside a JDK home
pub fn java_executable(home: &Path) -> PathBuf {
    if cfg!(windows) {
        return home.join("bin").join("java.exe");
    }
    if cfg!(target_os = "macos") {
        // Bundle roots keep the runtime under Contents/Home
        let bundled = home.join("Contents").join("Home").join("bin").join("java");
        if bundled.is_file() {
            return bundled;
        }
    }
    home.join("bin").join("java")
}

/// Run `java -version` from `home`, bounded by `timeout`
pub fn probe(home: &Path, timeout: Duration) -> JdkProbe {
    let java = java_executable(home);
    if !is_executable(&java) {
        tracing::debug!(java = %java.display(), "no executable java launcher");
        return JdkProbe::default();
    }

    let mut child = match Command::new(&java)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(java = %java.display(), error = %e, "failed to run JDK");
            return JdkProbe::default();
        }
    };

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            tracing::warn!(java = %java.display(), ?timeout, "java -version timed out");
            let _ = child.kill();
            let _ = child.wait();
            return JdkProbe::default();
        }
        Err(e) => {
            tracing::warn!(java = %java.display(), error = %e, "failed to wait for JDK");
            return JdkProbe::default();
        }
    };

    let mut banner = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut banner);
    }

    JdkProbe { version: parse_version_output(&banner), alive: status.success() }
}

/// Extract the quoted version from `java -version` output, e.g.
/// `openjdk version "17.0.2" 2022-01-18` yields `17.0.2`
pub fn parse_version_output(output: &str) -> Option<String> {
    output.lines().filter(|line| line.contains(" version ")).find_map(|line| {
        let start = line.find('"')? + 1;
        let len = line[start..].find('"')?;
        Some(line[start..start + len].to_string())
    })
}

/// Feature release of a version string: `1.8.0_292` is 8, `17.0.2` is 17
pub fn feature_version(version: &str) -> Option<u32> {
    let mut parts = version.split(|c: char| !c.is_ascii_digit()).filter(|s| !s.is_empty());
    let first: u32 = parts.next()?.parse().ok()?;
    if first == 1 {
        parts.next()?.parse().ok()
    } else {
        Some(first)
    }
}

/// Whether `version` is new enough to host a build
pub fn is_supported(version: &str) -> bool {
    feature_version(version).is_some_and(|feature| feature >= MIN_FEATURE_VERSION)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
#[path = "jdk_tests.rs"]
mod tests;
