// src/models/report.rs

//! Outcome of a pipeline run.

use std::fmt;

use crate::error::AppError;
use crate::models::{ArtifactReference, RecordTable};

/// Pipeline stages that degrade instead of aborting the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sort,
    Keywords,
    OpportunityIds,
    Export,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Sort => "sort by update date",
            Stage::Keywords => "keyword filter",
            Stage::OpportunityIds => "opportunity-id filter",
            Stage::Export => "export",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// An error a stage absorbed while the run carried on.
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub error: AppError,
}

impl StageError {
    pub fn new(stage: Stage, error: AppError) -> Self {
        Self { stage, error }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.error)
    }
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    /// Snapshot the run worked from
    pub artifact: ArtifactReference,

    /// Records produced by flattening, before any filter
    pub flattened_count: usize,

    /// Records that survived every filter, in digest order
    pub records: RecordTable,

    /// Rendered digest
    pub digest: String,

    /// Whether the digest reached the notification sink
    pub published: bool,

    /// Errors absorbed along the way
    pub stage_errors: Vec<StageError>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.stage_errors.is_empty()
    }
}
