// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tooling-proxy: serve one build request from an IDE, then exit.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tp_engine::{EngineConnector, GradleProcessConnector};
use tp_proxy::{logging, Config, LogLevel, Proxy};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init(LogLevel::from_args(std::env::args().skip(1)));

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tooling-proxy: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let connector: Arc<dyn EngineConnector> = match &config.gradle_executable {
        Some(gradle) => Arc::new(GradleProcessConnector::with_executable(gradle.clone())),
        None => Arc::new(GradleProcessConnector::new()),
    };

    let proxy = Proxy::bind(config).await?;
    let endpoint = proxy.endpoint();
    // The IDE reads this line to find the port
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "Gradle target server hostName: {} port: {}", endpoint.host, endpoint.port)?;
    stdout.flush()?;
    drop(stdout);

    proxy.serve(connector).await?;
    Ok(())
}
