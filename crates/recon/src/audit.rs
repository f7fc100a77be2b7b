//! Append-only record of every match commit.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::Layer;

/// Why one source group was matched to one or more reference rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub layer: Layer,
    pub source_ids: Vec<String>,
    pub reference_ids: Vec<String>,
    /// Absolute grand-total difference, in currency units rounded to 2 places.
    pub amount_difference: f64,
    pub rationale: String,
}

impl AuditEntry {
    /// Same entry with the timestamp ignored; two runs over identical input
    /// must agree on this.
    pub fn same_content(&self, other: &AuditEntry) -> bool {
        self.layer == other.layer
            && self.source_ids == other.source_ids
            && self.reference_ids == other.reference_ids
            && self.amount_difference == other.amount_difference
            && self.rationale == other.rationale
    }
}

/// Entries are ordered by commit and can only be appended.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub(crate) fn append(
        &mut self,
        layer: Layer,
        source_ids: Vec<String>,
        reference_ids: Vec<String>,
        difference_minor: i64,
        rationale: String,
    ) {
        self.entries.push(AuditEntry {
            timestamp: Utc::now(),
            layer,
            source_ids,
            reference_ids,
            amount_difference: difference_minor.abs() as f64 / 100.0,
            rationale,
        });
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<AuditEntry> {
        self.entries
    }
}
