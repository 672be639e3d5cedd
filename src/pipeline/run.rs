// src/pipeline/run.rs

//! Full digest pipeline: locate → fetch → extract → flatten → filter → render → publish.

use chrono::NaiveDate;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{
    ArtifactReference, Config, ParsedDocument, RecordTable, RunReport, Stage, StageError,
};
use crate::services::{
    ArchiveExtractor, ArtifactFetcher, ArtifactLocator, FilterLists, FilterSortEngine, Publisher,
    flatten, format_digest,
};
use crate::storage::{ListSource, LocalStorage, RecordStore};

const TOTAL_STEPS: usize = 6;

fn step(n: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", n, TOTAL_STEPS, message);
}

/// Locate, download, and parse the newest snapshot.
///
/// Failures here abort the run: without a document there is nothing to filter.
pub async fn acquire(
    config: &Config,
    storage: &LocalStorage,
    client: &Client,
    today: NaiveDate,
) -> Result<(ArtifactReference, ParsedDocument)> {
    step(1, "Locate - Probing for the latest snapshot");
    let locator = ArtifactLocator::new(client.clone(), config.source.clone());
    let artifact = locator.locate_from(today).await?;

    step(2, "Fetch - Downloading snapshot archive");
    let fetcher = ArtifactFetcher::new(client.clone(), config.source.clone(), &config.http);
    let archive = fetcher
        .fetch(&artifact, &storage.path(&config.paths.downloads_dir))
        .await?;

    step(3, "Extract - Unzipping and parsing");
    let extractor = ArchiveExtractor::new(storage.path(&config.paths.unzipped_dir));
    let archive_name = archive.display().to_string();
    let document = tokio::task::spawn_blocking(move || extractor.extract(&archive))
        .await
        .map_err(|e| AppError::extract(archive_name, e))??;

    Ok((artifact, document))
}

/// Run every stage and, when a publisher is given, deliver the digest.
pub async fn run_pipeline(
    config: &Config,
    storage: &LocalStorage,
    client: &Client,
    publisher: Option<&dyn Publisher>,
    today: NaiveDate,
) -> Result<RunReport> {
    let (artifact, document) = acquire(config, storage, client, today).await?;

    step(4, "Flatten - Building opportunity records");
    let table = flatten(&document, &config.source.detail_tag_marker);
    drop(document);
    let flattened_count = table.len();

    step(5, "Filter - Applying date and keyword filters");
    let (records, mut stage_errors) = filter_records(config, storage, table, today).await;

    if let Err(e) = storage
        .export_records(&config.paths.export_file, &records)
        .await
    {
        log::error!("Could not export filtered records: {}", e);
        stage_errors.push(StageError::new(Stage::Export, e));
    }

    step(6, "Digest - Rendering and publishing");
    let digest = format_digest(
        artifact.snapshot_date,
        &records,
        &config.digest.detail_base_url,
    );

    let published = match publisher {
        Some(publisher) => match publisher.publish(&digest).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to publish digest: {}", e);
                stage_errors.push(StageError::new(Stage::Publish, e));
                false
            }
        },
        None => {
            log::info!("No publisher configured, skipping delivery");
            false
        }
    };

    Ok(RunReport {
        artifact,
        flattened_count,
        records,
        digest,
        published,
        stage_errors,
    })
}

/// Load the filter lists and run the filter chain over `table`.
pub async fn filter_records(
    config: &Config,
    storage: &dyn ListSource,
    table: RecordTable,
    today: NaiveDate,
) -> (RecordTable, Vec<StageError>) {
    let keywords = storage.load_list(&config.paths.keywords_file).await;
    let opportunity_ids = if config.filter.filter_by_opportunity_id {
        Some(storage.load_list(&config.paths.opportunity_numbers_file).await)
    } else {
        None
    };

    let engine = FilterSortEngine::new(today, config.filter.recent_days);
    let outcome = engine.apply(
        table,
        FilterLists {
            keywords,
            opportunity_ids,
        },
    );
    (outcome.table, outcome.errors)
}
