// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log level selection from command-line tokens.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Verbosity selected by a `--<level>` token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    #[default]
    Error,
}

impl LogLevel {
    /// First recognised `--<level>` token in `args`; anything else is ignored
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        args.into_iter()
            .find_map(|arg| {
                let name = arg.as_ref().strip_prefix("--")?;
                <LogLevel as ValueEnum>::from_str(name, false).ok()
            })
            .unwrap_or_default()
    }

    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Install the process-wide subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `level` when set. Later calls are no-ops.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(level = level.as_directive(), "logging initialized");
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
