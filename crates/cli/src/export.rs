//! Annotated CSV outputs for `gstrecon run`.
//!
//! Writes four files into the output directory:
//!
//! - `source_reconciled.csv`: CIS rows plus status, category, GSTR-2B ids, remarks
//! - `reference_mapped.csv`: GSTR-2B rows plus status and CIS ids
//! - `layer_statistics.csv`: matched groups per layer, in execution order
//! - `audit_log.csv`: one line per match commit

use std::path::{Path, PathBuf};

use serde::Serialize;

use gstrecon::ReconResult;

use crate::CliError;

pub const SOURCE_FILE: &str = "source_reconciled.csv";
pub const REFERENCE_FILE: &str = "reference_mapped.csv";
pub const LAYER_STATS_FILE: &str = "layer_statistics.csv";
pub const AUDIT_FILE: &str = "audit_log.csv";

const SOURCE_COLUMNS: [&str; 5] =
    ["Matching Status", "Match Category", "GSTR 2B Key", "Short Remark", "Detailed Remark"];
const REFERENCE_COLUMNS: [&str; 2] = ["Matching Status", "CIS Key"];

fn join_ids(ids: &[String]) -> String {
    ids.join(", ")
}

fn csv_err(path: &Path, e: csv::Error) -> CliError {
    CliError::io(format!("cannot write {}: {e}", path.display()))
}

// ── Writers ─────────────────────────────────────────────────────────

fn write_source(result: &ReconResult, path: &Path) -> Result<(), CliError> {
    let mut w = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;

    let header = result.source.headers.iter().map(String::as_str).chain(SOURCE_COLUMNS);
    w.write_record(header).map_err(|e| csv_err(path, e))?;

    for row in &result.source.rows {
        let o = &row.outcome;
        let status = o.status.to_string();
        let category = o.match_category.map(|l| l.name()).unwrap_or_default();
        let keys = join_ids(&o.cross_reference_ids);
        let extra = [
            status.as_str(),
            category,
            keys.as_str(),
            o.short_remark.as_str(),
            o.detailed_remark.as_str(),
        ];
        w.write_record(row.fields.iter().map(String::as_str).chain(extra))
            .map_err(|e| csv_err(path, e))?;
    }

    w.flush().map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))
}

fn write_reference(result: &ReconResult, path: &Path) -> Result<(), CliError> {
    let mut w = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;

    let header = result.reference.headers.iter().map(String::as_str).chain(REFERENCE_COLUMNS);
    w.write_record(header).map_err(|e| csv_err(path, e))?;

    for row in &result.reference.rows {
        let status = row.outcome.status.to_string();
        let keys = join_ids(&row.outcome.cross_reference_ids);
        let extra = [status.as_str(), keys.as_str()];
        w.write_record(row.fields.iter().map(String::as_str).chain(extra))
            .map_err(|e| csv_err(path, e))?;
    }

    w.flush().map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))
}

#[derive(Serialize)]
struct LayerRow<'a> {
    #[serde(rename = "Layer")]
    layer: &'a str,
    #[serde(rename = "Matches")]
    matches: usize,
}

fn write_layer_stats(result: &ReconResult, path: &Path) -> Result<(), CliError> {
    let mut w = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    for count in result.layer_stats.iter() {
        w.serialize(LayerRow { layer: count.layer.name(), matches: count.matched_groups })
            .map_err(|e| csv_err(path, e))?;
    }
    w.flush().map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))
}

#[derive(Serialize)]
struct AuditRow<'a> {
    timestamp: String,
    layer: &'a str,
    source_ids: String,
    reference_ids: String,
    difference: String,
    detail: &'a str,
}

fn write_audit(result: &ReconResult, path: &Path) -> Result<(), CliError> {
    let mut w = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    if result.audit.is_empty() {
        // serialize() only emits headers alongside the first row.
        w.write_record(["timestamp", "layer", "source_ids", "reference_ids", "difference", "detail"])
            .map_err(|e| csv_err(path, e))?;
    }
    for entry in &result.audit {
        w.serialize(AuditRow {
            timestamp: entry.timestamp.to_rfc3339(),
            layer: entry.layer.name(),
            source_ids: join_ids(&entry.source_ids),
            reference_ids: join_ids(&entry.reference_ids),
            difference: format!("{:.2}", entry.amount_difference),
            detail: &entry.rationale,
        })
        .map_err(|e| csv_err(path, e))?;
    }
    w.flush().map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))
}

/// Write all four outputs into `dir`, creating it if needed. Returns the paths
/// written, in a fixed order.
pub fn write_outputs(result: &ReconResult, dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", dir.display())))?;

    let source = dir.join(SOURCE_FILE);
    let reference = dir.join(REFERENCE_FILE);
    let stats = dir.join(LAYER_STATS_FILE);
    let audit = dir.join(AUDIT_FILE);

    write_source(result, &source)?;
    write_reference(result, &reference)?;
    write_layer_stats(result, &stats)?;
    write_audit(result, &audit)?;

    Ok(vec![source, reference, stats, audit])
}
