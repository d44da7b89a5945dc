// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rw-cli`: a thin binary that wires the real subprocess connectors into
//! [`rw_engine::ReplicationWorker`] for manual or local runs. Not part of the
//! engine's contract — the workflow harness that owns production syncs talks
//! to the crate directly.

mod exit_error;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use exit_error::ExitError;
use rw_connectors::{BufferedSyncPersistence, EnvFlagClient, IdentityMapper, SubprocessDestination, SubprocessSource};
use rw_core::{ReplicationStatus, SyncInput, SystemClock};
use rw_engine::ReplicationWorker;

const PERSISTENCE_CHANNEL_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "rw-cli", about = "Run a replication attempt against a source and destination connector")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one replication attempt to completion.
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to a `SyncInput` document (JSON or TOML, detected by extension).
    sync_input: PathBuf,

    /// Scratch directory for connector input files. Must already exist.
    #[arg(long)]
    job_root: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            if let Some(exit_err) = err.downcast_ref::<ExitError>() {
                eprintln!("error: {exit_err}");
                std::process::exit(exit_err.code);
            }
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Run(args) => run_replication(args).await,
    }
}

async fn run_replication(args: RunArgs) -> Result<i32> {
    let sync_input = load_sync_input(&args.sync_input)?;
    if !args.job_root.is_dir() {
        return Err(ExitError::new(2, format!("job root {} is not a directory", args.job_root.display())).into());
    }

    let mut worker = ReplicationWorker::new(
        sync_input.config.clone(),
        SubprocessSource::new(),
        SubprocessDestination::new(),
        Box::new(IdentityMapper),
        BufferedSyncPersistence::new(PERSISTENCE_CHANNEL_CAPACITY),
        EnvFlagClient,
        SystemClock,
    );

    let output = worker.run(sync_input, &args.job_root).await.context("replication attempt failed to run")?;

    println!("{}", serde_json::to_string_pretty(&output).context("serializing replication output")?);

    Ok(match output.status {
        ReplicationStatus::Completed => 0,
        ReplicationStatus::Failed => 1,
        ReplicationStatus::Cancelled => 130,
    })
}

fn load_sync_input(path: &Path) -> Result<SyncInput> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading sync input file {}", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&contents).with_context(|| format!("parsing {} as TOML", path.display())),
        _ => serde_json::from_str(&contents).with_context(|| format!("parsing {} as JSON", path.display())),
    }
}
