//! CLI for cmis-sync: command parsing and the async `run` entrypoint.
//!
//! All reconciliation logic lives in `cmis-sync-core`; this module only wires
//! the loaded configuration, the CMIS client and the content detector together
//! and turns the run report into an exit status.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cmis_sync_core::detect::MagicDetector;
use cmis_sync_core::synchronise::synchronise;

use crate::cmis::CmisClient;
use crate::load_config::load_config;

/// CLI for cmis-sync: mirror a local folder into a CMIS repository.
#[derive(Parser)]
#[clap(
    name = "cmis-sync",
    version,
    about = "Upload a folder with sub-folders and files to a CMIS compliant repository"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mirror the configured local tree into the repository
    Upload {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Replace documents that already exist (overrides the config file)
        #[clap(long)]
        overwrite: bool,
        /// Stop at the first failed entry (overrides the config file)
        #[clap(long)]
        fail_fast: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Upload {
            config,
            overwrite,
            fail_fast,
        } => {
            let mut config = load_config(config)?;
            if overwrite {
                config.sync.overwrite = true;
            }
            if fail_fast {
                config.sync.fail_fast = true;
            }
            tracing::info!(command = "upload", "Starting upload");

            let connection = &config.connection;
            let client = CmisClient::connect(
                connection.url.as_str(),
                connection.credentials.clone(),
                connection.repository_id.as_deref(),
            )
            .await
            .with_context(|| format!("Failed to open CMIS session at {}", connection.url))?;

            let report = synchronise(&config.sync, &client, &MagicDetector).await?;
            println!(
                "Synchronise complete: {} folders created, {} documents uploaded, {} skipped, {} failed",
                report.folders_created(),
                report.documents_uploaded(),
                report.skipped(),
                report.failed()
            );

            if report.is_success() {
                tracing::info!(command = "upload", "Upload complete");
                Ok(())
            } else {
                for failed in report
                    .entries
                    .iter()
                    .filter(|e| e.error.is_some())
                {
                    eprintln!(
                        "[ERROR] {} -> {}: {}",
                        failed.local_path.display(),
                        failed.remote_path,
                        failed.error.as_deref().unwrap_or_default()
                    );
                }
                anyhow::bail!(
                    "{} entries failed{}",
                    report.failed(),
                    if report.aborted {
                        ", remaining entries were not processed"
                    } else {
                        ""
                    }
                )
            }
        }
    }
}
