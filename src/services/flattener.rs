// src/services/flattener.rs

//! Turn opportunity-detail subtrees into flat records.

use crate::models::{OpportunityRecord, ParsedDocument, RecordTable, XmlNode};

/// Flatten every node whose tag contains `marker` (case-insensitive).
///
/// Each descendant tag becomes a field holding its text content; when a name
/// repeats, the value seen last in document order wins. Nodes without any
/// child tags are logged and skipped.
pub fn flatten(doc: &ParsedDocument, marker: &str) -> RecordTable {
    let marker = marker.to_lowercase();
    let mut table = RecordTable::default();
    let mut skipped = 0usize;

    for node in doc
        .root
        .descendants()
        .filter(|n| n.name.to_lowercase().contains(&marker))
    {
        match flatten_node(node) {
            Some(record) => table.push(record),
            None => {
                skipped += 1;
                log::warn!("Skipping <{}> with no child fields", node.name);
            }
        }
    }

    log::info!(
        "Flattened {} opportunities from {} ({} skipped)",
        table.len(),
        doc.source.display(),
        skipped
    );
    table
}

fn flatten_node(node: &XmlNode) -> Option<OpportunityRecord> {
    let mut record = OpportunityRecord::new();
    for child in node.descendants().skip(1) {
        record.insert(child.name.clone(), child.text_content());
    }
    (!record.is_empty()).then_some(record)
}
