//! One reconciliation run's working state.
//!
//! The session owns both record collections, the clubbed groups and every
//! per-record outcome. Layers read through accessors and change state only
//! through [`ReconSession::commit`].

use std::collections::HashMap;

use crate::aggregate::club_source_records;
use crate::audit::AuditLog;
use crate::matcher::{InvoiceKeyKind, SupplierScope, STANDARD_LAYERS};
use crate::model::{
    ClubbedGroup, Layer, LayerStatistics, LedgerRecord, MatchCommit, MatchStatus, ReferenceOutcome,
    SourceOutcome,
};

type KeyIndex = HashMap<String, HashMap<String, Vec<usize>>>;

/// Reference row positions by (supplier key, invoice key), in input order.
#[derive(Debug, Default)]
struct CandidateIndex {
    by_key: HashMap<(SupplierScope, InvoiceKeyKind), KeyIndex>,
    by_supplier: HashMap<String, Vec<usize>>,
}

impl CandidateIndex {
    /// Index only the (scope, key) pairs some standard layer joins on.
    fn build(reference: &[LedgerRecord]) -> Self {
        let mut index = Self::default();
        for spec in STANDARD_LAYERS.iter() {
            let (scope, kind) = (spec.supplier_scope, spec.invoice_key);
            if index.by_key.contains_key(&(scope, kind)) {
                continue;
            }
            let map = index.by_key.entry((scope, kind)).or_default();
            for (i, record) in reference.iter().enumerate() {
                map.entry(scope.of(&record.keys).to_string())
                    .or_default()
                    .entry(kind.of(&record.keys).to_string())
                    .or_default()
                    .push(i);
            }
        }
        for (i, record) in reference.iter().enumerate() {
            index
                .by_supplier
                .entry(record.keys.supplier_id.clone())
                .or_default()
                .push(i);
        }
        index
    }

    fn lookup(&self, scope: SupplierScope, kind: InvoiceKeyKind, supplier: &str, key: &str) -> &[usize] {
        self.by_key
            .get(&(scope, kind))
            .and_then(|m| m.get(supplier))
            .and_then(|m| m.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn supplier(&self, supplier: &str) -> &[usize] {
        self.by_supplier
            .get(supplier)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub struct ReconSession {
    source: Vec<LedgerRecord>,
    reference: Vec<LedgerRecord>,
    groups: Vec<ClubbedGroup>,
    source_outcomes: Vec<SourceOutcome>,
    reference_outcomes: Vec<ReferenceOutcome>,
    audit: AuditLog,
    stats: LayerStatistics,
    index: CandidateIndex,
}

/// Everything a finished session hands to the result assembler.
pub struct SessionOutput {
    pub source: Vec<LedgerRecord>,
    pub reference: Vec<LedgerRecord>,
    pub groups: Vec<ClubbedGroup>,
    pub source_outcomes: Vec<SourceOutcome>,
    pub reference_outcomes: Vec<ReferenceOutcome>,
    pub audit: AuditLog,
    pub stats: LayerStatistics,
}

impl ReconSession {
    /// Club the source side and index the reference side. Every record starts
    /// unmatched.
    pub fn new(source: Vec<LedgerRecord>, reference: Vec<LedgerRecord>) -> Self {
        let groups = club_source_records(&source);
        let index = CandidateIndex::build(&reference);
        let source_outcomes = source
            .iter()
            .map(|r| SourceOutcome {
                record_id: r.id.clone(),
                status: MatchStatus::Unmatched,
                match_category: None,
                cross_reference_ids: Vec::new(),
                short_remark: String::new(),
                detailed_remark: String::new(),
            })
            .collect();
        let reference_outcomes = reference
            .iter()
            .map(|r| ReferenceOutcome {
                record_id: r.id.clone(),
                status: MatchStatus::Unmatched,
                cross_reference_ids: Vec::new(),
            })
            .collect();

        Self {
            source,
            reference,
            groups,
            source_outcomes,
            reference_outcomes,
            audit: AuditLog::default(),
            stats: LayerStatistics::default(),
            index,
        }
    }

    pub fn groups(&self) -> &[ClubbedGroup] {
        &self.groups
    }

    pub fn group(&self, g: usize) -> &ClubbedGroup {
        &self.groups[g]
    }

    pub fn reference_records(&self) -> &[LedgerRecord] {
        &self.reference
    }

    pub fn reference_record(&self, r: usize) -> &LedgerRecord {
        &self.reference[r]
    }

    pub fn is_reference_unmatched(&self, r: usize) -> bool {
        self.reference_outcomes[r].status == MatchStatus::Unmatched
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Unmatched reference rows whose supplier and invoice keys equal the
    /// given ones, in input order.
    pub fn keyed_candidates<'a>(
        &'a self,
        scope: SupplierScope,
        kind: InvoiceKeyKind,
        supplier: &str,
        key: &str,
    ) -> impl Iterator<Item = usize> + 'a {
        self.index
            .lookup(scope, kind, supplier, key)
            .iter()
            .copied()
            .filter(move |&r| self.is_reference_unmatched(r))
    }

    /// Unmatched reference rows with this exact normalized supplier id.
    pub fn supplier_candidates<'a>(&'a self, supplier: &str) -> impl Iterator<Item = usize> + 'a {
        self.index
            .supplier(supplier)
            .iter()
            .copied()
            .filter(move |&r| self.is_reference_unmatched(r))
    }

    /// Apply a match: audit first, then the group, reference rows and every
    /// group member.
    pub fn commit(&mut self, commit: MatchCommit) {
        debug_assert!(!self.groups[commit.group].is_matched(), "group committed twice");
        debug_assert!(
            commit.references.iter().all(|&r| self.is_reference_unmatched(r)),
            "reference row committed twice"
        );

        let source_ids = self.groups[commit.group].member_ids.clone();
        let reference_ids: Vec<String> = commit
            .references
            .iter()
            .map(|&r| self.reference[r].id.clone())
            .collect();

        log::debug!(
            "{}: source {:?} -> reference {:?} (diff {})",
            commit.layer,
            source_ids,
            reference_ids,
            commit.difference_minor
        );

        self.audit.append(
            commit.layer,
            source_ids.clone(),
            reference_ids.clone(),
            commit.difference_minor,
            commit.rationale.clone(),
        );

        let group = &mut self.groups[commit.group];
        group.mark_matched();

        for &r in &commit.references {
            let outcome = &mut self.reference_outcomes[r];
            outcome.status = MatchStatus::Matched;
            outcome.cross_reference_ids = source_ids.clone();
        }

        for &m in &group.members {
            let outcome = &mut self.source_outcomes[m];
            outcome.status = MatchStatus::Matched;
            outcome.match_category = Some(commit.layer);
            outcome.cross_reference_ids = reference_ids.clone();
            outcome.short_remark = "Matched".to_string();
            outcome.detailed_remark = commit.rationale.clone();
        }
    }

    pub fn record_layer(&mut self, layer: Layer, matched_groups: usize) {
        log::info!("{layer}: {matched_groups} group(s) matched");
        self.stats.record(layer, matched_groups);
    }

    pub fn finish(self) -> SessionOutput {
        SessionOutput {
            source: self.source,
            reference: self.reference,
            groups: self.groups,
            source_outcomes: self.source_outcomes,
            reference_outcomes: self.reference_outcomes,
            audit: self.audit,
            stats: self.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Amounts, NormalizedKeys};

    fn rec(id: &str, gstin: &str, inv: &str) -> LedgerRecord {
        LedgerRecord {
            id: id.into(),
            supplier_raw: gstin.into(),
            invoice_raw: inv.into(),
            date_raw: String::new(),
            date: None,
            amounts: Amounts::from_components(100_000, 0, 0, 0),
            keys: NormalizedKeys::derive(gstin, inv),
        }
    }

    #[test]
    fn index_covers_only_layer_join_keys() {
        let index = CandidateIndex::build(&[rec("100000", "27AAACX1234A1Z5", "INV/2024/0042")]);
        let mut pairs: Vec<_> = index.by_key.keys().copied().collect();
        pairs.sort_by_key(|&(scope, kind)| (scope as u8, kind as u8));
        assert_eq!(
            pairs,
            vec![
                (SupplierScope::Exact, InvoiceKeyKind::Basic),
                (SupplierScope::Exact, InvoiceKeyKind::Numeric),
                (SupplierScope::Exact, InvoiceKeyKind::LastFour),
                (SupplierScope::EntityPrefix, InvoiceKeyKind::Basic),
            ]
        );
    }

    #[test]
    fn keyed_candidates_skip_matched_rows() {
        let source = vec![rec("1", "27AAACX1234A1Z5", "INV-7")];
        let reference = vec![
            rec("100000", "27AAACX1234A2Z4", "INV7"),
            rec("100001", "27AAACX1234A1Z5", "INV7"),
        ];
        let mut session = ReconSession::new(source, reference);
        let pan = session.group(0).keys.entity_prefix.clone();
        let found: Vec<usize> = session
            .keyed_candidates(SupplierScope::EntityPrefix, InvoiceKeyKind::Basic, &pan, "INV7")
            .collect();
        assert_eq!(found, vec![0, 1]);

        session.commit(MatchCommit {
            layer: Layer::Strict,
            group: 0,
            references: vec![1],
            difference_minor: 0,
            rationale: "Matched".into(),
        });
        let found: Vec<usize> = session
            .keyed_candidates(SupplierScope::EntityPrefix, InvoiceKeyKind::Basic, &pan, "INV7")
            .collect();
        assert_eq!(found, vec![0]);
    }
}
