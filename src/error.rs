// src/error.rs

//! Unified error handling for the digest pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// No snapshot was published within the probe window
    #[error("No snapshot found between {earliest} and {latest}")]
    NotFound { earliest: String, latest: String },

    /// Archive download failed
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Archive decompression or document parsing failed
    #[error("Extract error for {path}: {message}")]
    Extract { path: String, message: String },

    /// A record field could not be interpreted
    #[error("Invalid {field} '{value}': {message}")]
    ParseField {
        field: String,
        value: String,
        message: String,
    },

    /// A filter list is missing or unusable
    #[error("Filter configuration error: {0}")]
    FilterConfig(String),

    /// The notification sink rejected the digest
    #[error("Publish error: {0}")]
    Publish(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a download error with the offending URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an extraction error with the offending path.
    pub fn extract(path: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Extract {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a field parsing error.
    pub fn parse_field(
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::ParseField {
            field: field.into(),
            value: value.into(),
            message: message.to_string(),
        }
    }

    /// Create a filter configuration error.
    pub fn filter_config(message: impl Into<String>) -> Self {
        Self::FilterConfig(message.into())
    }

    /// Create a publish error.
    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
