// src/services/filters.rs

//! Recency, open-status, keyword, and ID filters plus the update-date sort.
//!
//! Every stage takes a table by value and returns a new one. The
//! [`FilterSortEngine`] chains them in a fixed order and keeps going when a
//! stage fails, recording the failure instead.

use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::models::{
    OpportunityRecord, RecordTable, Stage, StageError, fields, parse_record_date,
};

/// Whether `date_str` falls no more than `window_days` before `today`.
///
/// Future dates always count as recent.
pub fn is_recent(date_str: &str, window_days: i64, today: NaiveDate) -> Result<bool> {
    let date = parse_record_date(fields::LAST_UPDATED_DATE, date_str)?;
    Ok((today - date).num_days() <= window_days)
}

/// Whether an opportunity with this close date is still accepting applications.
///
/// A missing close date means the opportunity has no deadline and is open.
pub fn is_open(close_date: Option<&str>, today: NaiveDate) -> Result<bool> {
    match close_date.filter(|v| !v.trim().is_empty()) {
        None => Ok(true),
        Some(raw) => {
            let date = parse_record_date(fields::CLOSE_DATE, raw)?;
            Ok((today - date).num_days() <= 0)
        }
    }
}

/// Keep records updated within the last `window_days` days.
pub fn filter_recent(table: RecordTable, window_days: i64, today: NaiveDate) -> RecordTable {
    let before = table.len();
    let table = table.retain(|record| {
        let Some(raw) = record.get(fields::LAST_UPDATED_DATE) else {
            log::debug!("Dropping {} without LastUpdatedDate", describe(record));
            return false;
        };
        is_recent(raw, window_days, today).unwrap_or_else(|e| {
            log::debug!("Dropping {}: {}", describe(record), e);
            false
        })
    });
    log::info!(
        "Recency filter kept {} of {} records ({} day window)",
        table.len(),
        before,
        window_days
    );
    table
}

/// Keep records that have not closed yet.
pub fn filter_open(table: RecordTable, today: NaiveDate) -> RecordTable {
    let before = table.len();
    let table = table.retain(|record| {
        is_open(record.get(fields::CLOSE_DATE), today).unwrap_or_else(|e| {
            log::debug!("Dropping {}: {}", describe(record), e);
            false
        })
    });
    log::info!("Open-status filter kept {} of {} records", table.len(), before);
    table
}

/// Derive `UpdateDate` for every record and order newest first.
///
/// Only the first record is required to parse; later records that do not
/// parse keep `UpdateDate` unset and sort last.
pub fn sort_by_recent_update(table: RecordTable) -> Result<RecordTable> {
    if let Some(first) = table.first() {
        first.last_updated()?;
    }

    let mut records = table.into_records();
    for record in &mut records {
        record.update_date = record.last_updated().ok();
    }
    // Option orders None first, so comparing b to a puts None last.
    records.sort_by(|a, b| b.update_date.cmp(&a.update_date));

    log::info!("Sorted {} records by most recent update", records.len());
    Ok(RecordTable::new(records))
}

/// Keep records whose description contains any keyword (case-insensitive).
pub fn filter_by_keywords(table: RecordTable, keywords: &[String]) -> Result<RecordTable> {
    let needles = normalize(keywords);
    if needles.is_empty() {
        return Err(AppError::filter_config("keyword list is empty"));
    }
    let before = table.len();
    let table = table.retain(|record| contains_any(record.description(), &needles));
    log::info!("Keyword filter kept {} of {} records", table.len(), before);
    Ok(table)
}

/// Keep records whose opportunity ID contains any of `ids` (case-insensitive).
pub fn filter_by_opportunity_id(table: RecordTable, ids: &[String]) -> Result<RecordTable> {
    let needles = normalize(ids);
    if needles.is_empty() {
        return Err(AppError::filter_config("opportunity number list is empty"));
    }
    let before = table.len();
    let table = table.retain(|record| contains_any(record.opportunity_id(), &needles));
    log::info!(
        "Opportunity-id filter kept {} of {} records",
        table.len(),
        before
    );
    Ok(table)
}

fn normalize(patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

fn contains_any(value: Option<&str>, needles: &[String]) -> bool {
    value.is_some_and(|v| {
        let v = v.to_lowercase();
        needles.iter().any(|n| v.contains(n.as_str()))
    })
}

fn describe(record: &OpportunityRecord) -> String {
    format!("opportunity {}", record.opportunity_id().unwrap_or("<no id>"))
}

/// Filter lists handed to the engine.
///
/// Each list is the outcome of loading it, so that a missing source surfaces
/// as a failure of the stage that needed it.
pub struct FilterLists {
    pub keywords: Result<Vec<String>>,
    /// `None` leaves the opportunity-id stage off
    pub opportunity_ids: Option<Result<Vec<String>>>,
}

/// Result of running the whole filter chain.
#[derive(Debug)]
pub struct FilterOutcome {
    pub table: RecordTable,
    pub errors: Vec<StageError>,
}

/// Applies recency, open-status, sort, keyword, and ID stages in that order.
#[derive(Debug, Clone, Copy)]
pub struct FilterSortEngine {
    today: NaiveDate,
    recent_days: i64,
}

impl FilterSortEngine {
    pub fn new(today: NaiveDate, recent_days: i64) -> Self {
        Self { today, recent_days }
    }

    /// Run every stage over `table`.
    ///
    /// A failed sort leaves the table in its previous order. A failed keyword
    /// or ID stage empties the table, since publishing unfiltered results
    /// would misrepresent the digest.
    pub fn apply(&self, table: RecordTable, lists: FilterLists) -> FilterOutcome {
        let mut errors = Vec::new();

        let table = filter_recent(table, self.recent_days, self.today);
        let table = filter_open(table, self.today);

        let table = match sort_by_recent_update(table.clone()) {
            Ok(sorted) => sorted,
            Err(e) => {
                log::error!("Could not sort by update date: {}", e);
                errors.push(StageError::new(Stage::Sort, e));
                table
            }
        };

        let table = match lists
            .keywords
            .and_then(|keywords| filter_by_keywords(table, &keywords))
        {
            Ok(filtered) => filtered,
            Err(e) => {
                log::error!("Keyword filter failed: {}", e);
                errors.push(StageError::new(Stage::Keywords, e));
                RecordTable::default()
            }
        };

        let table = match lists.opportunity_ids {
            None => table,
            Some(ids) => match ids.and_then(|ids| filter_by_opportunity_id(table, &ids)) {
                Ok(filtered) => filtered,
                Err(e) => {
                    log::error!("Opportunity-id filter failed: {}", e);
                    errors.push(StageError::new(Stage::OpportunityIds, e));
                    RecordTable::default()
                }
            },
        };

        FilterOutcome { table, errors }
    }
}
