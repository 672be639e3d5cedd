//! Service layer for the digest pipeline.
//!
//! This module contains the business logic for:
//! - Snapshot discovery (`ArtifactLocator`)
//! - Snapshot download (`ArtifactFetcher`)
//! - Archive extraction and parsing (`ArchiveExtractor`)
//! - Record flattening, filtering, and digest rendering
//! - Digest delivery (`Publisher`)

pub mod digest;
pub mod extractor;
pub mod fetcher;
pub mod filters;
pub mod flattener;
pub mod locator;
pub mod notify;

pub use digest::format_digest;
pub use extractor::ArchiveExtractor;
pub use fetcher::ArtifactFetcher;
pub use filters::{FilterLists, FilterOutcome, FilterSortEngine};
pub use flattener::flatten;
pub use locator::ArtifactLocator;
pub use notify::{DiscordWebhook, Publisher};
