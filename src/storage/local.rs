//! Local filesystem storage implementation.
//!
//! Exports are written atomically (write to temp, then rename) so a crashed
//! run never leaves a half-written table behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::RecordTable;
use crate::storage::{ListSource, RecordStore, parse_list};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Name of the newest cached snapshot archive in `dir`, if any.
    pub fn cached_archive(&self, dir: &str) -> Result<Option<String>> {
        let path = self.path(dir);
        if !path.is_dir() {
            return Ok(None);
        }
        let mut names: Vec<String> = std::fs::read_dir(&path)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".zip"))
            .collect();
        names.sort();
        Ok(names.pop())
    }
}

#[async_trait]
impl RecordStore for LocalStorage {
    async fn export_records(&self, name: &str, records: &RecordTable) -> Result<()> {
        self.write_json(name, records).await?;
        log::info!("Exported {} records to {}", records.len(), self.path(name).display());
        Ok(())
    }

    async fn import_records(&self, name: &str) -> Result<RecordTable> {
        self.read_json(name).await?.ok_or_else(|| {
            AppError::config(format!("No exported records at {}", self.path(name).display()))
        })
    }
}

#[async_trait]
impl ListSource for LocalStorage {
    async fn load_list(&self, name: &str) -> Result<Vec<String>> {
        let bytes = self.read_bytes(name).await?.ok_or_else(|| {
            AppError::filter_config(format!("{} not found", self.path(name).display()))
        })?;
        let content = String::from_utf8(bytes).map_err(|e| {
            AppError::filter_config(format!("{} is not valid UTF-8: {}", name, e))
        })?;
        Ok(parse_list(&content))
    }
}
