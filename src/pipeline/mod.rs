//! Pipeline entry points.
//!
//! - `acquire`: Locate, download, and parse the newest snapshot
//! - `run_pipeline`: Acquire, filter, render, and publish a digest

pub mod run;

pub use run::{acquire, filter_records, run_pipeline};
