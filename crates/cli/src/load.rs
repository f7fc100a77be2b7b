//! CSV ledger loading and header resolution.
//!
//! The engine consumes fully resolved column names. Real exports rarely spell
//! headers the way a config does ("Taxable Value (₹)" vs "Taxable Value"), so
//! each configured name is matched against the file's headers exactly first,
//! then in normalized form. A field may list several accepted names; the first
//! one present wins.
//!
//! GSTR-2B portal exports carry a banner and a two-row header ("Invoice Details"
//! above "Invoice number"), so the reference ledger's header is discovered
//! rather than assumed to be line 1.

use std::path::Path;

use gstrecon::config::LedgerConfig;
use gstrecon::{ColumnNames, FieldMapping, Ledger, LedgerTable, ReconConfig, ReconInput};

use crate::exit_codes::EXIT_RECON_MISSING_COLUMN;
use crate::CliError;

/// Rows scanned for header markers.
const HEADER_SCAN_ROWS: usize = 8;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Where a table's header lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    /// Line 1 is the header.
    FirstRow,
    /// Scan the first rows for the GSTIN and invoice-number header rows and
    /// stitch them into one header.
    Detect,
}

impl HeaderLayout {
    pub fn for_ledger(ledger: Ledger) -> Self {
        match ledger {
            Ledger::Source => HeaderLayout::FirstRow,
            Ledger::Reference => HeaderLayout::Detect,
        }
    }
}

/// Read a CSV file into a [`LedgerTable`]. Header cells are trimmed; data cells
/// are kept verbatim. Ragged rows pass through so the engine can report them
/// with ledger and row context.
pub fn read_table(path: &Path, layout: HeaderLayout) -> Result<LedgerTable, CliError> {
    let data = std::fs::read(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    parse_table(&data, layout).map_err(|msg| CliError::parse(format!("{}: {msg}", path.display())))
}

fn parse_table(data: &[u8], layout: HeaderLayout) -> Result<LedgerTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut lines: Vec<Vec<String>> = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("CSV parse error at line {}: {e}", i + 1))?;
        lines.push(record.iter().map(str::to_string).collect());
    }
    if let Some(first) = lines.first_mut().and_then(|line| line.first_mut()) {
        *first = first.trim_start_matches('\u{feff}').to_string();
    }
    if lines.is_empty() {
        return Ok(LedgerTable::new(Vec::new(), Vec::new()));
    }

    let (headers, header_end) = match layout {
        HeaderLayout::FirstRow => (header_cells(&lines[0]), 0),
        HeaderLayout::Detect => stitch_headers(&lines),
    };
    if header_end > 0 {
        tracing::debug!("header found on line {}, data starts on line {}", header_end + 1, header_end + 2);
    }

    let rows = lines.split_off(header_end + 1);
    Ok(LedgerTable::new(headers, rows))
}

fn header_cells(line: &[String]) -> Vec<String> {
    line.iter().map(|h| h.trim().to_string()).collect()
}

/// Locate the last GSTIN row and the last invoice-number row among the first
/// [`HEADER_SCAN_ROWS`] lines (line 1 when absent). Each header cell comes from
/// the invoice row, else the GSTIN row, else `Column_<i>`. Returns the headers
/// and the index of the last header line.
fn stitch_headers(lines: &[Vec<String>]) -> (Vec<String>, usize) {
    let contains = |line: &[String], needle: &str| {
        line.iter().any(|cell| cell.to_lowercase().contains(needle))
    };

    let scanned = &lines[..lines.len().min(HEADER_SCAN_ROWS)];
    let mut gstin_row = 0;
    let mut invoice_row = 0;
    for (i, line) in scanned.iter().enumerate() {
        if contains(line, "gstin") {
            gstin_row = i;
        }
        if contains(line, "invoice number") || contains(line, "invoice no") {
            invoice_row = i;
        }
    }

    let cell = |row: usize, c: usize| lines[row].get(c).map(|v| v.trim()).unwrap_or("");
    let width = lines[gstin_row].len().max(lines[invoice_row].len());
    let headers = (0..width)
        .map(|c| {
            let (invoice, gstin) = (cell(invoice_row, c), cell(gstin_row, c));
            if !invoice.is_empty() {
                invoice.to_string()
            } else if !gstin.is_empty() {
                gstin.to_string()
            } else {
                format!("Column_{c}")
            }
        })
        .collect();

    (headers, gstin_row.max(invoice_row))
}

// ---------------------------------------------------------------------------
// Header resolution
// ---------------------------------------------------------------------------

/// Lowercase and drop spaces, newlines, underscores and the rupee sign.
pub fn normalize_header(header: &str) -> String {
    let compact: String = header
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\n' | '\r' | '_'))
        .collect();
    compact.replace("(₹)", "").replace('₹', "")
}

/// First accepted name present in `headers`, each tried exactly and then
/// normalized before moving to the next.
fn find_column<'a>(headers: &'a [String], column: &ColumnNames) -> Option<&'a String> {
    column.names().iter().find_map(|name| {
        if let Some(exact) = headers.iter().find(|h| h.as_str() == name.as_str()) {
            return Some(exact);
        }
        let wanted = normalize_header(name);
        headers.iter().find(|h| normalize_header(h) == wanted)
    })
}

/// Rewrite every configured column name to the header it resolves to.
pub fn resolve_columns(
    ledger: Ledger,
    columns: &FieldMapping,
    headers: &[String],
) -> Result<FieldMapping, CliError> {
    let lookup = |field: &str, column: &ColumnNames| -> Result<ColumnNames, CliError> {
        let found = find_column(headers, column).ok_or_else(|| CliError {
            code: EXIT_RECON_MISSING_COLUMN,
            message: format!("{ledger} ledger: column '{column}' for field '{field}' not found"),
            hint: Some(format!("available headers: {}", headers.join(", "))),
        })?;
        Ok(ColumnNames::from(found.as_str()))
    };

    let record_id = match &columns.record_id {
        Some(column) => Some(lookup("record_id", column)?),
        None => None,
    };

    Ok(FieldMapping {
        record_id,
        supplier_id: lookup("supplier_id", &columns.supplier_id)?,
        invoice_number: lookup("invoice_number", &columns.invoice_number)?,
        invoice_date: lookup("invoice_date", &columns.invoice_date)?,
        taxable_amount: lookup("taxable_amount", &columns.taxable_amount)?,
        integrated_tax: lookup("integrated_tax", &columns.integrated_tax)?,
        central_tax: lookup("central_tax", &columns.central_tax)?,
        state_tax: lookup("state_tax", &columns.state_tax)?,
    })
}

// ---------------------------------------------------------------------------
// Config-driven loading
// ---------------------------------------------------------------------------

fn load_ledger(
    ledger: Ledger,
    ledger_config: &mut LedgerConfig,
    base_dir: &Path,
) -> Result<LedgerTable, CliError> {
    let path = base_dir.join(&ledger_config.file);
    let table = read_table(&path, HeaderLayout::for_ledger(ledger))?;
    ledger_config.columns = resolve_columns(ledger, &ledger_config.columns, &table.headers)?;
    tracing::info!(
        "loaded {ledger} ledger {}: {} rows, {} columns",
        path.display(),
        table.len(),
        table.headers.len()
    );
    Ok(table)
}

/// Load both ledgers named by `config`, with file paths resolved relative to
/// `base_dir`. Returns the config with its column mappings rewritten to the
/// actual headers, ready for the engine.
pub fn load_input(
    config: &ReconConfig,
    base_dir: &Path,
) -> Result<(ReconConfig, ReconInput), CliError> {
    let mut resolved = config.clone();
    let source = load_ledger(Ledger::Source, &mut resolved.source, base_dir)?;
    let reference = load_ledger(Ledger::Reference, &mut resolved.reference, base_dir)?;
    Ok((resolved, ReconInput { source, reference }))
}
