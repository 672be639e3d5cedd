// src/models/mod.rs

//! Domain models for the digest pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod artifact;
mod config;
mod document;
mod record;
mod report;

// Re-export all public types
pub use artifact::ArtifactReference;
pub use config::{
    Config, DigestConfig, FilterConfig, HttpConfig, NotifyConfig, PathsConfig, SourceConfig,
    WEBHOOK_ENV,
};
pub use document::{Descendants, ParsedDocument, XmlNode};
pub use record::{OpportunityRecord, RECORD_DATE_FORMAT, RecordTable, fields, parse_record_date};
pub use report::{RunReport, Stage, StageError};
