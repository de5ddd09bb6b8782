///
/// This module implements the CLI for drive-bucket: command parsing, wiring of real
/// clients, and user-visible output. It is also the trigger adapter for scheduled runs,
/// which invoke the same binary with `transfer` and an environment-only configuration.
///
/// All pipeline logic lives in the library modules; this file only glues them together.
///
/// ## How To Use
/// - From a shell: `drive-bucket transfer --config transfer.yaml`, or without `--config`
///   to read everything from the environment.
/// - `drive-bucket list` shows what a transfer would do without moving any bytes.
/// - Programmatically: call [`run`] with a constructed [`Cli`].
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::auth::{Credentials, TokenEndpoints, DRIVE_READONLY_SCOPE, STORAGE_WRITE_SCOPE};
use crate::config::TransferConfig;
use crate::download::DriveClient;
use crate::list::{build_query, list_items};
use crate::load_config::{load_config, load_config_from_env};
use crate::synchronise::{plan_tasks, run_batch, BatchOutcome};
use crate::transfer::TaskResult;
use crate::upload::GcsClient;

/// CLI for drive-bucket: copy matching Drive files into a Cloud Storage bucket.
#[derive(Parser)]
#[clap(
    name = "drive-bucket",
    version,
    about = "Stream filtered Google Drive files into a Cloud Storage bucket"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transfer every matching file to the bucket
    Transfer {
        /// Path to the YAML config file; the environment is used when omitted
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// List matching files with their destination keys, without transferring
    List {
        /// Path to the YAML config file; the environment is used when omitted
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

fn resolve_config(path: Option<PathBuf>) -> Result<TransferConfig> {
    match path {
        Some(path) => load_config(path),
        None => load_config_from_env(),
    }
}

async fn connect_drive(http: &reqwest::Client) -> Result<DriveClient> {
    let token = Credentials::drive_from_env()
        .access_token(http, DRIVE_READONLY_SCOPE, &TokenEndpoints::default())
        .await
        .context("Failed to authorise against Google Drive")?;
    Ok(DriveClient::new(http.clone(), token))
}

async fn connect_bucket(http: &reqwest::Client) -> Result<GcsClient> {
    let token = Credentials::bucket_from_env()
        .access_token(http, STORAGE_WRITE_SCOPE, &TokenEndpoints::default())
        .await
        .context("Failed to authorise against Cloud Storage")?;
    Ok(GcsClient::new(http.clone(), token))
}

fn print_report(outcome: &BatchOutcome) {
    println!(
        "Transfer {:?} (run {}): {} processed, {} succeeded, {} skipped, {} failed",
        outcome.status,
        outcome.run_id,
        outcome.processed(),
        outcome.succeeded(),
        outcome.skipped(),
        outcome.failures().count()
    );
    for report in &outcome.items {
        match &report.result {
            TaskResult::Succeeded { bytes } => println!(
                "  ok      {} -> {} ({bytes} bytes)",
                report.item.name, report.destination_key
            ),
            TaskResult::Skipped { reason } => {
                println!("  skipped {} ({reason})", report.item.name)
            }
            TaskResult::Failed(e) => println!("  FAILED  {}: {e}", report.item.name),
        }
    }
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Transfer { config } => {
            let config = resolve_config(config)?;
            let http = reqwest::Client::new();
            let source = connect_drive(&http).await?;
            let sink = connect_bucket(&http).await?;

            let outcome = run_batch(&config, &source, &sink).await;
            print_report(&outcome);
            match outcome.into_result() {
                Ok(_) => {
                    tracing::info!(command = "transfer", "Transfer complete");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "transfer", error = %e, "Transfer failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
        Commands::List { config } => {
            let config = resolve_config(config)?;
            let http = reqwest::Client::new();
            let source = connect_drive(&http).await?;

            let query = build_query(&config.source).context("Invalid configuration")?;
            let items = list_items(&source, &query)
                .await
                .context("Listing Google Drive failed")?;
            if items.is_empty() {
                println!("No matching files.");
            }
            for task in plan_tasks(items, &config.sink.destination_prefix) {
                println!(
                    "{} ({}) [{}] -> {:?} gs://{}/{}",
                    task.item.name,
                    task.item.id,
                    task.item.content_type,
                    task.decision,
                    config.sink.bucket,
                    task.destination_key
                );
            }
            Ok(())
        }
    }
}
