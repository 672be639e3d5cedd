//! grants-digest CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use grants_digest::{
    error::{AppError, Result},
    models::{ArtifactReference, Config},
    pipeline,
    services::{ArtifactLocator, DiscordWebhook, Publisher, format_digest},
    storage::{ListSource, LocalStorage, RecordStore},
    utils::http,
};

/// grants-digest - grants.gov snapshot digest
#[derive(Parser, Debug)]
#[command(
    name = "grants-digest",
    version,
    about = "Digest of recently updated grants.gov opportunities"
)]

struct Cli {
    /// Path to storage directory containing config and filter lists
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run full pipeline: Locate → Fetch → Extract → Filter → Publish
    Run {
        /// Render the digest without posting it
        #[arg(long)]
        no_publish: bool,

        /// Also filter by the opportunity-number list
        #[arg(long)]
        by_id: bool,

        /// Override how many days back to probe
        #[arg(long)]
        max_days_back: Option<u32>,
    },

    /// Probe for the latest snapshot and print its URL
    Locate {
        /// Override how many days back to probe
        #[arg(long)]
        max_days_back: Option<u32>,
    },

    /// Re-render the digest from the last exported records
    Digest {
        /// Snapshot date to show (default: date of the cached archive)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Validate configuration and filter lists
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("grants-digest starting...");

    // Load configuration once, then apply environment overrides
    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    config.apply_env();

    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let storage = LocalStorage::new(&cli.storage_dir);
    let today = Local::now().date_naive();

    match cli.command {
        Command::Run {
            no_publish,
            by_id,
            max_days_back,
        } => {
            if let Some(days) = max_days_back {
                config.source.max_days_back = days;
            }
            if by_id {
                config.filter.filter_by_opportunity_id = true;
            }
            config.validate()?;

            let client = http::create_client(&config.http)?;
            let webhook = match (&config.notify.webhook_url, no_publish) {
                (Some(url), false) => Some(DiscordWebhook::new(
                    client.clone(),
                    url.clone(),
                    config.notify.max_message_len,
                )),
                (None, false) => {
                    log::error!("No webhook url found (set {})", grants_digest::models::WEBHOOK_ENV);
                    None
                }
                (_, true) => None,
            };
            let publisher = webhook.as_ref().map(|w| w as &dyn Publisher);

            let report = pipeline::run_pipeline(&config, &storage, &client, publisher, today).await?;

            println!("{}", report.digest);

            log::info!(
                "Snapshot {}: {} opportunities flattened, {} kept",
                report.artifact.snapshot_date,
                report.flattened_count,
                report.records.len()
            );
            if report.published {
                log::info!("Digest published");
            }
            if !report.is_clean() {
                log::warn!("{} stage(s) reported errors:", report.stage_errors.len());
                for stage_error in &report.stage_errors {
                    log::warn!("    {}", stage_error);
                }
            }
        }

        Command::Locate { max_days_back } => {
            if let Some(days) = max_days_back {
                config.source.max_days_back = days;
            }
            config.validate()?;
            let client = http::create_client(&config.http)?;
            let locator = ArtifactLocator::new(client, config.source.clone());
            let artifact = locator.locate_from(today).await?;
            println!("{}", artifact.remote_url);
        }

        Command::Digest { date } => {
            let snapshot_date = match date {
                Some(date) => date,
                None => {
                    let artifact = storage
                        .cached_archive(&config.paths.downloads_dir)?
                        .and_then(|name| {
                            ArtifactReference::from_file_name(&config.source.base_url, &name)
                        })
                        .ok_or_else(|| {
                            AppError::config("No cached archive found; pass --date explicitly")
                        })?;
                    log::info!("Using cached snapshot {}", artifact.remote_url);
                    artifact.snapshot_date
                }
            };

            let records = storage.import_records(&config.paths.export_file).await?;
            println!(
                "{}",
                format_digest(snapshot_date, &records, &config.digest.detail_base_url)
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            let keywords = storage.load_list(&config.paths.keywords_file).await?;
            if keywords.is_empty() {
                return Err(AppError::filter_config(format!(
                    "{} has no keywords",
                    config.paths.keywords_file
                )));
            }
            log::info!("✓ {} keywords loaded", keywords.len());

            if config.filter.filter_by_opportunity_id {
                let ids = storage
                    .load_list(&config.paths.opportunity_numbers_file)
                    .await?;
                log::info!("✓ {} opportunity numbers loaded", ids.len());
            }

            if config.notify.webhook_url.is_none() {
                log::warn!("No webhook configured; digests will not be published");
            }

            log::info!("All validations passed!");
        }
    }

    log::info!("Done!");

    Ok(())
}
