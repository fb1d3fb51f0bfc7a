// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! syd: the Switchyard server daemon.
//!
//! Loads the declarative configuration, builds the supervised
//! component hierarchy, and serves until shutdown. `SIGHUP` reloads
//! the configuration in-process; `SIGINT`/`SIGTERM` shut down
//! gracefully.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use sy_config::ServerConfig;
use sy_core::TagLogger;
use sy_daemon::events::ChainLogSink;
use sy_daemon::{build_hierarchy, ProcessHost, SystemRoot};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "syd", version, about = "Configuration-driven HTTP(S) application server")]
struct Args {
    /// Path to the HCL configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    if args.check {
        return match ServerConfig::load(&args.config) {
            Ok(_) => {
                tracing::info!(config = %args.config.display(), "config ok");
                ExitCode::SUCCESS
            }
            Err(error) => {
                tracing::error!(%error, "config invalid");
                ExitCode::FAILURE
            }
        };
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!(%error, "cannot start runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "fatal");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    // Fail fast on an unloadable initial config.
    let _ = ServerConfig::load(&args.config)?;

    let base_dir = args
        .config
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    // Every tag-logger emission lands on this chain; the
    // system-logger service drains it to a file when configured.
    let chain = ChainLogSink::new(256);
    let logger = TagLogger::root(Arc::new(chain.clone()));

    let builder = {
        let path = args.config.clone();
        let base_dir = base_dir.clone();
        let records = chain.source().clone();
        Box::new(move || {
            let config = ServerConfig::load(&path)?;
            build_hierarchy(&config, &base_dir, records.clone())
        })
    };

    let host = Arc::new(ProcessHost::new());
    let system = SystemRoot::new(builder, Arc::clone(&host), logger)?;
    system.run().await?;
    Ok(())
}
