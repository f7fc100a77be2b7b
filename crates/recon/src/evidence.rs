use chrono::NaiveDate;

use crate::model::{
    ClubbedGroup, LedgerRecord, MatchStatus, MismatchAnalysis, ReconSummary, ReferenceOutcome,
    SourceOutcome,
};
use crate::normalize::is_usable_key;

/// GSTINs are fixed-width.
pub const GSTIN_LEN: usize = 15;

/// Advisory only: known date strictly before the cutoff.
pub fn is_time_barred(date: Option<NaiveDate>, cutoff: NaiveDate) -> bool {
    date.is_some_and(|d| d < cutoff)
}

/// Compute summary statistics from the final outcomes.
pub fn compute_summary(
    source: &[LedgerRecord],
    source_outcomes: &[SourceOutcome],
    reference_outcomes: &[ReferenceOutcome],
    groups: &[ClubbedGroup],
    cutoff: NaiveDate,
) -> ReconSummary {
    let source_matched = source_outcomes
        .iter()
        .filter(|o| o.status == MatchStatus::Matched)
        .count();
    let reference_matched = reference_outcomes
        .iter()
        .filter(|o| o.status == MatchStatus::Matched)
        .count();
    let match_rate_pct = if source.is_empty() {
        0.0
    } else {
        (source_matched as f64 / source.len() as f64 * 10_000.0).round() / 100.0
    };

    ReconSummary {
        source_records: source.len(),
        source_matched,
        source_unmatched: source.len() - source_matched,
        match_rate_pct,
        reference_records: reference_outcomes.len(),
        reference_matched,
        reference_unmatched: reference_outcomes.len() - reference_matched,
        source_groups: groups.len(),
        matched_groups: groups.iter().filter(|g| g.is_matched()).count(),
        time_barred: source.iter().filter(|r| is_time_barred(r.date, cutoff)).count(),
        analysis: analyze_mismatches(source, source_outcomes, cutoff),
    }
}

/// Likely causes for each unmatched source record. One record can count
/// under several headings.
pub fn analyze_mismatches(
    source: &[LedgerRecord],
    source_outcomes: &[SourceOutcome],
    cutoff: NaiveDate,
) -> MismatchAnalysis {
    let mut analysis = MismatchAnalysis::default();

    for (record, outcome) in source.iter().zip(source_outcomes) {
        if outcome.status != MatchStatus::Unmatched {
            continue;
        }
        analysis.total_unmatched += 1;
        if !is_usable_key(&record.keys.invoice_basic) {
            analysis.invoice_format_issues += 1;
        }
        if record.keys.supplier_id.chars().count() != GSTIN_LEN {
            analysis.gstin_issues += 1;
        }
        if record.amounts.grand_total == 0 {
            analysis.amount_issues += 1;
        }
        if is_time_barred(record.date, cutoff) {
            analysis.time_barred += 1;
        }
    }

    analysis
}
