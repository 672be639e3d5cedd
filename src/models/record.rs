// src/models/record.rs

//! Flattened opportunity records.
//!
//! Records are schema-on-read: every child tag of an opportunity-detail node
//! becomes a field. The accessors below cover the fields that filtering and
//! digest rendering depend on.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Date format used by the snapshot for every date field.
pub const RECORD_DATE_FORMAT: &str = "%m%d%Y";

/// Field names the pipeline relies on.
pub mod fields {
    pub const LAST_UPDATED_DATE: &str = "LastUpdatedDate";
    pub const CLOSE_DATE: &str = "CloseDate";
    pub const OPPORTUNITY_ID: &str = "OpportunityID";
    pub const OPPORTUNITY_TITLE: &str = "OpportunityTitle";
    pub const OPPORTUNITY_NUMBER: &str = "OpportunityNumber";
    pub const DESCRIPTION: &str = "Description";
}

/// Parse a snapshot date field such as `03012024`.
pub fn parse_record_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), RECORD_DATE_FORMAT)
        .map_err(|e| AppError::parse_field(field, value, e))
}

/// One opportunity, keyed by tag name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityRecord {
    /// Derived from `LastUpdatedDate` by the sort stage
    #[serde(
        rename = "UpdateDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub update_date: Option<NaiveDate>,

    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl OpportunityRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field; a later value for the same name replaces the earlier one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style `insert`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn opportunity_id(&self) -> Option<&str> {
        self.get(fields::OPPORTUNITY_ID)
    }

    pub fn title(&self) -> Option<&str> {
        self.get(fields::OPPORTUNITY_TITLE)
    }

    pub fn number(&self) -> Option<&str> {
        self.get(fields::OPPORTUNITY_NUMBER)
    }

    pub fn description(&self) -> Option<&str> {
        self.get(fields::DESCRIPTION)
    }

    /// Raw close date; blank values count as absent.
    pub fn close_date_raw(&self) -> Option<&str> {
        self.get(fields::CLOSE_DATE).filter(|v| !v.trim().is_empty())
    }

    /// Parsed `LastUpdatedDate`.
    pub fn last_updated(&self) -> Result<NaiveDate> {
        let raw = self.get(fields::LAST_UPDATED_DATE).ok_or_else(|| {
            AppError::parse_field(fields::LAST_UPDATED_DATE, "", "field is missing")
        })?;
        parse_record_date(fields::LAST_UPDATED_DATE, raw)
    }

    /// Parsed `CloseDate`, `None` when the record has no close date.
    pub fn close_date(&self) -> Result<Option<NaiveDate>> {
        self.close_date_raw()
            .map(|raw| parse_record_date(fields::CLOSE_DATE, raw))
            .transpose()
    }
}

/// Ordered collection of records from one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordTable {
    records: Vec<OpportunityRecord>,
}

impl RecordTable {
    pub fn new(records: Vec<OpportunityRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OpportunityRecord> {
        self.records.iter()
    }

    pub fn first(&self) -> Option<&OpportunityRecord> {
        self.records.first()
    }

    pub fn push(&mut self, record: OpportunityRecord) {
        self.records.push(record);
    }

    /// Keep only records matching `predicate`.
    pub fn retain(mut self, predicate: impl FnMut(&OpportunityRecord) -> bool) -> Self {
        self.records.retain(predicate);
        self
    }

    pub fn into_records(self) -> Vec<OpportunityRecord> {
        self.records
    }
}

impl FromIterator<OpportunityRecord> for RecordTable {
    fn from_iter<I: IntoIterator<Item = OpportunityRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RecordTable {
    type Item = OpportunityRecord;
    type IntoIter = std::vec::IntoIter<OpportunityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordTable {
    type Item = &'a OpportunityRecord;
    type IntoIter = std::slice::Iter<'a, OpportunityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
