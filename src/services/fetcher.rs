// src/services/fetcher.rs

//! Snapshot downloader.
//!
//! The download cache holds at most one archive: older archives are purged
//! before the new body is streamed to a `.part` file, which is renamed into
//! place only once the whole body has been written.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{AppError, Result};
use crate::models::{ArtifactReference, HttpConfig, SourceConfig};
use crate::utils::pause;

/// Service that downloads a located snapshot archive.
pub struct ArtifactFetcher {
    client: Client,
    source: SourceConfig,
    download_timeout: Duration,
}

impl ArtifactFetcher {
    pub fn new(client: Client, source: SourceConfig, http: &HttpConfig) -> Self {
        Self {
            client,
            source,
            download_timeout: Duration::from_secs(http.download_timeout_secs),
        }
    }

    /// Download `artifact` into `destination_dir`, returning the archive path.
    pub async fn fetch(
        &self,
        artifact: &ArtifactReference,
        destination_dir: &Path,
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(destination_dir).await?;
        purge_archives(destination_dir).await?;

        let target = destination_dir.join(&artifact.local_file_name);
        let partial = destination_dir.join(format!("{}.part", artifact.local_file_name));

        log::info!("Downloading {}...", artifact.remote_url);
        match self.download(&artifact.remote_url, &partial).await {
            Ok(bytes) => {
                tokio::fs::rename(&partial, &target).await?;
                pause(self.source.settle_delay_ms).await;
                log::info!("Downloaded {} ({} bytes)", artifact.local_file_name, bytes);
                Ok(target)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        log::warn!("Could not remove {}: {}", partial.display(), cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    /// Stream the response body to `path`, returning the byte count.
    async fn download(&self, url: &str, path: &Path) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| AppError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("unexpected status {status}")));
        }

        let file = tokio::fs::File::create(path).await?;
        let mut writer = BufWriter::with_capacity(self.source.chunk_size.max(1), file);
        let mut written = 0u64;

        while let Some(chunk) = response.chunk().await.map_err(|e| AppError::fetch(url, e))? {
            // keep-alive chunks carry no payload
            if chunk.is_empty() {
                continue;
            }
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;
        Ok(written)
    }
}

/// Remove every cached archive (and stale partial download) in `dir`.
async fn purge_archives(dir: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(".zip") || name.ends_with(".zip.part") {
            log::debug!("Removing cached archive {}", name);
            tokio::fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}
