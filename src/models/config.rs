//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Environment variable holding the notification webhook.
pub const WEBHOOK_ENV: &str = "DISCORD_WEBHOOK";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Snapshot host and probing behavior
    #[serde(default)]
    pub source: SourceConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Record filtering settings
    #[serde(default)]
    pub filter: FilterConfig,

    /// Digest rendering settings
    #[serde(default)]
    pub digest: DigestConfig,

    /// Notification sink settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Cache and list locations, relative to the storage directory
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides using the given variable lookup.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(WEBHOOK_ENV).filter(|v| !v.trim().is_empty()) {
            self.notify.webhook_url = Some(url.trim().to_string());
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.download_timeout_secs == 0 {
            return Err(AppError::validation(
                "http.download_timeout_secs must be > 0",
            ));
        }
        if self.source.chunk_size == 0 {
            return Err(AppError::validation("source.chunk_size must be > 0"));
        }
        if self.source.detail_tag_marker.trim().is_empty() {
            return Err(AppError::validation("source.detail_tag_marker is empty"));
        }
        if self.filter.recent_days <= 0 {
            return Err(AppError::validation("filter.recent_days must be > 0"));
        }
        if self.notify.max_message_len == 0 {
            return Err(AppError::validation("notify.max_message_len must be > 0"));
        }
        Url::parse(&self.source.base_url)?;
        Url::parse(&self.digest.detail_base_url)?;
        if let Some(webhook) = &self.notify.webhook_url {
            Url::parse(webhook)?;
        }
        Ok(())
    }
}

/// Snapshot host and probing behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Host serving `extracts/GrantsDBExtract<YYYYMMDD>v2.zip`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// How many days before today the locator may walk back
    #[serde(default = "defaults::max_days_back")]
    pub max_days_back: u32,

    /// Pause between failed probes in milliseconds
    #[serde(default = "defaults::probe_delay")]
    pub probe_delay_ms: u64,

    /// Pause after a download completes in milliseconds
    #[serde(default = "defaults::settle_delay")]
    pub settle_delay_ms: u64,

    /// Write buffer size for archive downloads
    #[serde(default = "defaults::chunk_size")]
    pub chunk_size: usize,

    /// Case-insensitive substring identifying opportunity-detail tags
    #[serde(default = "defaults::detail_tag_marker")]
    pub detail_tag_marker: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            max_days_back: defaults::max_days_back(),
            probe_delay_ms: defaults::probe_delay(),
            settle_delay_ms: defaults::settle_delay(),
            chunk_size: defaults::chunk_size(),
            detail_tag_marker: defaults::detail_tag_marker(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Timeout for probes and webhook posts in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Timeout for the full archive download in seconds
    #[serde(default = "defaults::download_timeout")]
    pub download_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            download_timeout_secs: defaults::download_timeout(),
        }
    }
}

/// Record filtering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Records last updated more than this many days ago are dropped
    #[serde(default = "defaults::recent_days")]
    pub recent_days: i64,

    /// Also restrict results to the opportunity-number list
    #[serde(default)]
    pub filter_by_opportunity_id: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            recent_days: defaults::recent_days(),
            filter_by_opportunity_id: false,
        }
    }
}

/// Digest rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Prefix joined with `OpportunityID` to build detail links
    #[serde(default = "defaults::detail_base_url")]
    pub detail_base_url: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            detail_base_url: defaults::detail_base_url(),
        }
    }
}

/// Notification sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook endpoint; publishing is skipped when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Maximum characters per posted message
    #[serde(default = "defaults::max_message_len")]
    pub max_message_len: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            max_message_len: defaults::max_message_len(),
        }
    }
}

/// Cache and list locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding at most one downloaded archive
    #[serde(default = "defaults::downloads_dir")]
    pub downloads_dir: String,

    /// Directory holding the extracted document
    #[serde(default = "defaults::unzipped_dir")]
    pub unzipped_dir: String,

    /// Newline-delimited keyword list
    #[serde(default = "defaults::keywords_file")]
    pub keywords_file: String,

    /// Newline-delimited opportunity-number list
    #[serde(default = "defaults::opportunity_numbers_file")]
    pub opportunity_numbers_file: String,

    /// Export of the filtered records
    #[serde(default = "defaults::export_file")]
    pub export_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            downloads_dir: defaults::downloads_dir(),
            unzipped_dir: defaults::unzipped_dir(),
            keywords_file: defaults::keywords_file(),
            opportunity_numbers_file: defaults::opportunity_numbers_file(),
            export_file: defaults::export_file(),
        }
    }
}

mod defaults {
    // Source defaults
    pub fn base_url() -> String {
        "https://prod-grants-gov-chatbot.s3.amazonaws.com".into()
    }
    pub fn max_days_back() -> u32 {
        6
    }
    pub fn probe_delay() -> u64 {
        1000
    }
    pub fn settle_delay() -> u64 {
        3000
    }
    pub fn chunk_size() -> usize {
        512
    }
    pub fn detail_tag_marker() -> String {
        "opportunitysynopsisdetail".into()
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; grants-digest/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn download_timeout() -> u64 {
        900
    }

    // Filter defaults
    pub fn recent_days() -> i64 {
        60
    }

    // Digest defaults
    pub fn detail_base_url() -> String {
        "https://www.grants.gov/search-results-detail/".into()
    }

    // Notify defaults
    pub fn max_message_len() -> usize {
        2000
    }

    // Path defaults
    pub fn downloads_dir() -> String {
        "downloads".into()
    }
    pub fn unzipped_dir() -> String {
        "unzipped".into()
    }
    pub fn keywords_file() -> String {
        "keywords.txt".into()
    }
    pub fn opportunity_numbers_file() -> String {
        "opportunity_numbers.txt".into()
    }
    pub fn export_file() -> String {
        "cleaned.json".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_recent_days() {
        let mut config = Config::default();
        config.filter.recent_days = 0;
        assert!(config.validate().is_err());
        config.filter.recent_days = -5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_detail_url() {
        let mut config = Config::default();
        config.digest.detail_base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [source]
            max_days_back = 3

            [filter]
            recent_days = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.source.max_days_back, 3);
        assert_eq!(config.source.probe_delay_ms, 1000);
        assert_eq!(config.filter.recent_days, 30);
        assert!(!config.filter.filter_by_opportunity_id);
        assert_eq!(config.paths.downloads_dir, "downloads");
    }

    #[test]
    fn apply_env_sets_webhook() {
        let mut config = Config::default();
        config.apply_env_with(|key| {
            (key == WEBHOOK_ENV).then(|| " https://discord.com/api/webhooks/1/abc ".to_string())
        });
        assert_eq!(
            config.notify.webhook_url.as_deref(),
            Some("https://discord.com/api/webhooks/1/abc")
        );
    }

    #[test]
    fn apply_env_ignores_blank_webhook() {
        let mut config = Config::default();
        config.apply_env_with(|_| Some("   ".to_string()));
        assert!(config.notify.webhook_url.is_none());
    }
}
