//! Storage abstractions for the pipeline's flat-file collaborators.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml               # Pipeline configuration
//! ├── keywords.txt              # Keyword list, one per line
//! ├── opportunity_numbers.txt   # Optional ID list, one per line
//! ├── cleaned.json              # Export of the filtered records
//! ├── downloads/                # At most one snapshot archive
//! └── unzipped/                 # The extracted snapshot document
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::RecordTable;

// Re-export for convenience
pub use local::LocalStorage;

/// Sink and source for record tables.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist `records` under `name`, replacing any previous export.
    async fn export_records(&self, name: &str, records: &RecordTable) -> Result<()>;

    /// Load a table written by `export_records`.
    async fn import_records(&self, name: &str) -> Result<RecordTable>;
}

/// Provider of newline-delimited string lists.
#[async_trait]
pub trait ListSource: Send + Sync {
    /// Load the list called `name`; a missing list is a filter configuration error.
    async fn load_list(&self, name: &str) -> Result<Vec<String>>;
}

/// Parse a newline-delimited list, skipping blank lines and `#` comments.
pub fn parse_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
