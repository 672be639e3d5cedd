// src/services/digest.rs

//! Plain-text digest of the filtered opportunities.

use chrono::NaiveDate;

use crate::models::{OpportunityRecord, RecordTable};

const HEADER_RULE: &str = "=======================================";
const ENTRY_RULE: &str = "----------------------------------";
const FOOTER: &str = "FOAs filtered by date and keywords";

/// Render `records` (already in display order) as a digest.
pub fn format_digest(
    snapshot_date: NaiveDate,
    records: &RecordTable,
    detail_base_url: &str,
) -> String {
    let mut text = format!(
        "Showing {} recently updated FOAs from grants.gov, extracted on {}:",
        records.len(),
        snapshot_date.format("%Y-%m-%d")
    );
    text.push('\n');
    text.push_str(HEADER_RULE);

    for (i, record) in records.iter().enumerate() {
        text.push('\n');
        text.push_str(&format_entry(i + 1, record, detail_base_url));
        text.push('\n');
        text.push_str(ENTRY_RULE);
    }

    text.push('\n');
    text.push_str(FOOTER);
    text
}

fn format_entry(position: usize, record: &OpportunityRecord, detail_base_url: &str) -> String {
    let id = record.opportunity_id().unwrap_or_default();
    format!(
        "{}) Updated: {},  Closes: {}, Title: {}, {} ({})\n{}{}",
        position,
        updated_label(record),
        closes_label(record),
        record.title().unwrap_or("untitled").to_uppercase(),
        record.number().unwrap_or_default(),
        id,
        detail_base_url,
        id
    )
}

fn updated_label(record: &OpportunityRecord) -> String {
    record
        .update_date
        .or_else(|| record.last_updated().ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn closes_label(record: &OpportunityRecord) -> String {
    match record.close_date() {
        Ok(Some(date)) => date.format("%B %-d, %Y").to_string(),
        Ok(None) => "no close date".to_string(),
        Err(_) => record.close_date_raw().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fields;

    const BASE: &str = "https://www.grants.gov/search-results-detail/";

    fn snapshot() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 13).unwrap()
    }

    #[test]
    fn test_format_entries() {
        let mut record = OpportunityRecord::new()
            .with(fields::OPPORTUNITY_ID, "352014")
            .with(fields::OPPORTUNITY_TITLE, "Rural health outreach")
            .with(fields::OPPORTUNITY_NUMBER, "HRSA-24-101")
            .with(fields::LAST_UPDATED_DATE, "04102024")
            .with(fields::CLOSE_DATE, "06012024");
        record.update_date = NaiveDate::from_ymd_opt(2024, 4, 10);
        let open_ended = OpportunityRecord::new()
            .with(fields::OPPORTUNITY_ID, "350001")
            .with(fields::OPPORTUNITY_TITLE, "Open call")
            .with(fields::OPPORTUNITY_NUMBER, "NSF-24-1")
            .with(fields::LAST_UPDATED_DATE, "04012024");
        let table = RecordTable::new(vec![record, open_ended]);

        let text = format_digest(snapshot(), &table, BASE);

        let expected = "\
Showing 2 recently updated FOAs from grants.gov, extracted on 2024-04-13:
=======================================
1) Updated: 2024-04-10,  Closes: June 1, 2024, Title: RURAL HEALTH OUTREACH, HRSA-24-101 (352014)
https://www.grants.gov/search-results-detail/352014
----------------------------------
2) Updated: 2024-04-01,  Closes: no close date, Title: OPEN CALL, NSF-24-1 (350001)
https://www.grants.gov/search-results-detail/350001
----------------------------------
FOAs filtered by date and keywords";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_format_empty_table() {
        let text = format_digest(snapshot(), &RecordTable::default(), BASE);
        assert!(text.starts_with("Showing 0 recently updated FOAs"));
        assert!(text.ends_with(FOOTER));
        assert_eq!(text.lines().count(), 3);
    }
}
