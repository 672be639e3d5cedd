// src/models/artifact.rs

//! Reference to one dated database snapshot.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Date format embedded in snapshot file names.
const FILE_DATE_FORMAT: &str = "%Y%m%d";

/// A located snapshot archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReference {
    /// Full URL of the remote archive
    pub remote_url: String,

    /// File name used in the download cache
    pub local_file_name: String,

    /// Publication date of the snapshot
    pub snapshot_date: NaiveDate,
}

impl ArtifactReference {
    /// Build the reference for the snapshot published on `date`.
    pub fn for_date(base_url: &str, date: NaiveDate) -> Self {
        let local_file_name = Self::file_name(date);
        let remote_url = format!(
            "{}/extracts/{}",
            base_url.trim_end_matches('/'),
            local_file_name
        );
        Self {
            remote_url,
            local_file_name,
            snapshot_date: date,
        }
    }

    /// Snapshot archive file name for `date`.
    pub fn file_name(date: NaiveDate) -> String {
        format!("GrantsDBExtract{}v2.zip", date.format(FILE_DATE_FORMAT))
    }

    /// Recover the snapshot date from a cached archive name.
    pub fn date_from_file_name(name: &str) -> Option<NaiveDate> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        let pattern = PATTERN
            .get_or_init(|| Regex::new(r"GrantsDBExtract(\d{8})v2").ok())
            .as_ref()?;
        let caps = pattern.captures(name)?;
        NaiveDate::parse_from_str(caps.get(1)?.as_str(), FILE_DATE_FORMAT).ok()
    }

    /// Rebuild a reference from a cached archive name.
    pub fn from_file_name(base_url: &str, name: &str) -> Option<Self> {
        Self::date_from_file_name(name).map(|date| Self::for_date(base_url, date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let artifact = ArtifactReference::for_date("https://example.com/", date);
        assert_eq!(artifact.local_file_name, "GrantsDBExtract20240303v2.zip");
        assert_eq!(
            artifact.remote_url,
            "https://example.com/extracts/GrantsDBExtract20240303v2.zip"
        );
    }

    #[test]
    fn test_from_file_name() {
        let artifact =
            ArtifactReference::from_file_name("https://example.com", "GrantsDBExtract20240229v2.zip")
                .unwrap();
        assert_eq!(
            artifact.snapshot_date,
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            artifact.remote_url,
            "https://example.com/extracts/GrantsDBExtract20240229v2.zip"
        );
        assert!(ArtifactReference::date_from_file_name("notes.zip").is_none());
        assert!(ArtifactReference::date_from_file_name("GrantsDBExtract20241340v2.zip").is_none());
    }
}
