#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the trash-bin dataset download tool.
//!
//! Stands in for the map UI as the fetcher's consumer: it renders the
//! progress stream as an `indicatif` bar, maps Ctrl-C to a cooperative
//! cancel, and writes the normalized records to a JSON file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use trash_map_fetcher::fetcher::DatasetFetcher;
use trash_map_fetcher::registry::{all_datasets, find_dataset};
use trash_map_fetcher::{FetchError, FetchEvent};
use trash_map_fetcher_models::TrashBin;

#[derive(Parser)]
#[command(name = "trash_map_cli", about = "Taipei trash-bin dataset download tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a dataset and write the normalized records to a JSON file
    Fetch {
        /// Dataset identifier (e.g., "`taipei_trash`")
        #[arg(long, default_value = "taipei_trash")]
        dataset: String,
        /// Output file for the normalized records
        #[arg(long, default_value = "trash_bins.json")]
        output: PathBuf,
    },
    /// List all configured datasets
    Datasets,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = trash_map_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Datasets => {
            let datasets = all_datasets();
            println!("{:<20} NAME", "ID");
            println!("{}", "-".repeat(50));
            for dataset in &datasets {
                println!("{:<20} {}", dataset.id, dataset.name);
            }
        }
        Commands::Fetch { dataset, output } => {
            let definition =
                find_dataset(&dataset).ok_or_else(|| format!("Unknown dataset: {dataset}"))?;
            log::info!("Downloading {}...", definition.name);

            let fetcher = DatasetFetcher::new(definition)?;
            let mut rx = fetcher.start_download();
            let bar = trash_map_cli_utils::fraction_bar(&multi, "Downloading");

            let outcome = tokio::select! {
                outcome = async {
                    let mut outcome: Option<Result<Vec<TrashBin>, FetchError>> = None;
                    while let Some(event) = rx.recv().await {
                        match event {
                            FetchEvent::Progress(fraction) => {
                                trash_map_cli_utils::set_fraction(&bar, fraction);
                            }
                            FetchEvent::Completed(bins) => outcome = Some(Ok(bins)),
                            FetchEvent::Failed(e) => outcome = Some(Err(e)),
                        }
                    }
                    outcome
                } => outcome,
                _ = tokio::signal::ctrl_c() => {
                    fetcher.cancel_download();
                    None
                }
            };

            match outcome {
                Some(Ok(bins)) => {
                    bar.finish_and_clear();
                    let json = serde_json::to_string_pretty(&bins)?;
                    std::fs::write(&output, json)?;
                    log::info!("Wrote {} bins to {}", bins.len(), output.display());
                }
                Some(Err(e)) => {
                    bar.abandon();
                    log::error!("Download failed: {e}");
                    return Err(e.into());
                }
                None => {
                    bar.abandon();
                    log::warn!("Download cancelled");
                }
            }
        }
    }

    Ok(())
}
