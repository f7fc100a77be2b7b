//! Table rows → typed [`LedgerRecord`]s through a resolved field mapping.

use std::collections::HashSet;

use crate::config::{ColumnNames, FieldMapping};
use crate::error::ReconError;
use crate::model::{Ledger, LedgerRecord, LedgerTable};
use crate::normalize::{parse_invoice_date, try_parse_amount, Amounts, NormalizedKeys};

/// Reference ids are synthesized from this base so they never collide with
/// source ids in the cross-reference columns.
pub const REFERENCE_ID_BASE: usize = 100_000;

/// Column positions for every mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFields {
    pub record_id: Option<usize>,
    pub supplier_id: usize,
    pub invoice_number: usize,
    pub invoice_date: usize,
    pub taxable_amount: usize,
    pub integrated_tax: usize,
    pub central_tax: usize,
    pub state_tax: usize,
}

/// Resolve each mapped field to a header position. Accepted names are tried in
/// order, each as an exact match after trimming. A missing column is fatal.
pub fn resolve_fields(
    ledger: Ledger,
    headers: &[String],
    mapping: &FieldMapping,
) -> Result<ResolvedFields, ReconError> {
    let idx = |field: &'static str, column: &ColumnNames| -> Result<usize, ReconError> {
        column
            .names()
            .iter()
            .find_map(|name| headers.iter().position(|h| h.trim() == name.trim()))
            .ok_or_else(|| ReconError::MissingField {
                ledger,
                field,
                column: column.to_string(),
            })
    };

    Ok(ResolvedFields {
        record_id: match mapping.record_id {
            Some(ref column) => Some(idx("record_id", column)?),
            None => None,
        },
        supplier_id: idx("supplier_id", &mapping.supplier_id)?,
        invoice_number: idx("invoice_number", &mapping.invoice_number)?,
        invoice_date: idx("invoice_date", &mapping.invoice_date)?,
        taxable_amount: idx("taxable_amount", &mapping.taxable_amount)?,
        integrated_tax: idx("integrated_tax", &mapping.integrated_tax)?,
        central_tax: idx("central_tax", &mapping.central_tax)?,
        state_tax: idx("state_tax", &mapping.state_tax)?,
    })
}

/// Build one record per table row, deriving keys and amounts up front.
///
/// Malformed cells degrade (amount → 0, date → unknown) with a warning;
/// structural problems (ragged rows, duplicate ids) are errors.
pub fn build_records(
    ledger: Ledger,
    table: &LedgerTable,
    mapping: &FieldMapping,
) -> Result<Vec<LedgerRecord>, ReconError> {
    let fields = resolve_fields(ledger, &table.headers, mapping)?;
    let mut seen: HashSet<String> = HashSet::with_capacity(table.rows.len());
    let mut records = Vec::with_capacity(table.rows.len());

    for (i, row) in table.rows.iter().enumerate() {
        if row.len() != table.headers.len() {
            return Err(ReconError::RowWidth {
                ledger,
                row: i + 1,
                expected: table.headers.len(),
                found: row.len(),
            });
        }

        let id = match fields.record_id {
            Some(col) => row[col].trim().to_string(),
            None => synthesized_id(ledger, i),
        };
        if !seen.insert(id.clone()) {
            return Err(ReconError::DuplicateRecordId { ledger, id });
        }

        let amount = |col: usize, field: &str| -> i64 {
            try_parse_amount(&row[col]).unwrap_or_else(|| {
                log::warn!("{ledger} record {id}: unparsable {field} '{}', using 0", row[col]);
                0
            })
        };
        let amounts = Amounts::from_components(
            amount(fields.taxable_amount, "taxable amount"),
            amount(fields.integrated_tax, "integrated tax"),
            amount(fields.central_tax, "central tax"),
            amount(fields.state_tax, "state tax"),
        );

        let date_raw = row[fields.invoice_date].clone();
        let date = parse_invoice_date(&date_raw);
        if date.is_none() && !date_raw.trim().is_empty() {
            log::warn!("{ledger} record {id}: unparsable invoice date '{date_raw}'");
        }

        let supplier_raw = row[fields.supplier_id].clone();
        let invoice_raw = row[fields.invoice_number].clone();
        let keys = NormalizedKeys::derive(&supplier_raw, &invoice_raw);

        records.push(LedgerRecord {
            id,
            supplier_raw,
            invoice_raw,
            date_raw,
            date,
            amounts,
            keys,
        });
    }

    Ok(records)
}

fn synthesized_id(ledger: Ledger, row: usize) -> String {
    match ledger {
        Ledger::Source => (row + 1).to_string(),
        Ledger::Reference => (REFERENCE_ID_BASE + row).to_string(),
    }
}
