//! Final remarks and the annotated output tables.

use chrono::Utc;

use crate::config::ReconConfig;
use crate::evidence::{compute_summary, is_time_barred};
use crate::model::{
    AnnotatedLedger, AnnotatedRow, LedgerTable, MatchStatus, ReconInput, ReconMeta, ReconResult,
};
use crate::session::SessionOutput;

pub const NOT_FOUND_SHORT: &str = "Not Found";
pub const NOT_FOUND_DETAIL: &str = "Mismatch: Invoice Number not found in GSTR-2B";
pub const TIME_BARRED_SHORT: &str = " + Time Barred";

/// Stamp unmatched remarks and time-barred flags, then attach every outcome to
/// its input row.
pub fn assemble(config: &ReconConfig, input: &ReconInput, output: SessionOutput) -> ReconResult {
    let SessionOutput {
        source,
        groups,
        mut source_outcomes,
        reference_outcomes,
        audit,
        stats,
        ..
    } = output;
    let cutoff = config.time_barred.cutoff;
    let time_barred_detail = format!(" [Warning: Date < {}]", cutoff.format("%d %b %Y"));

    for (record, outcome) in source.iter().zip(source_outcomes.iter_mut()) {
        if outcome.status == MatchStatus::Unmatched {
            outcome.short_remark = NOT_FOUND_SHORT.to_string();
            outcome.detailed_remark = NOT_FOUND_DETAIL.to_string();
        }
        if is_time_barred(record.date, cutoff) {
            outcome.short_remark.push_str(TIME_BARRED_SHORT);
            outcome.detailed_remark.push_str(&time_barred_detail);
        }
    }

    let summary = compute_summary(&source, &source_outcomes, &reference_outcomes, &groups, cutoff);

    ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: Utc::now().to_rfc3339(),
            tolerance: config.tolerance,
        },
        summary,
        layer_stats: stats,
        source: annotate(&input.source, source_outcomes),
        reference: annotate(&input.reference, reference_outcomes),
        audit: audit.into_entries(),
    }
}

fn annotate<T>(table: &LedgerTable, outcomes: Vec<T>) -> AnnotatedLedger<T> {
    AnnotatedLedger {
        headers: table.headers.clone(),
        rows: table
            .rows
            .iter()
            .zip(outcomes)
            .map(|(fields, outcome)| AnnotatedRow {
                fields: fields.clone(),
                outcome,
            })
            .collect(),
    }
}
