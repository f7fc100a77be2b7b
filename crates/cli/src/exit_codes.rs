//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | run              | Unmatched records (`--fail-on-unmatched`) |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 3-9     | Universal        | Input/output failures                    |
//! | 60-69   | recon            | Reconciliation config and engine codes   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use gstrecon::ReconError;

// =============================================================================
// Universal (0-9)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Unmatched CIS records remain and `--fail-on-unmatched` was given.
/// Like `diff(1)`, exit 1 means "inputs differ."
pub const EXIT_UNMATCHED: u8 = 1;

/// Usage error - bad arguments, out-of-range options.
pub const EXIT_USAGE: u8 = 2;

/// Cannot read an input or write an output file.
pub const EXIT_IO: u8 = 3;

/// Malformed CSV (bad quoting, invalid UTF-8, ragged rows).
pub const EXIT_CSV_PARSE: u8 = 4;

// =============================================================================
// Recon (60-69)
// =============================================================================

/// Config file failed to parse or validate.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 60;

/// A configured column name matches no header in its CSV.
pub const EXIT_RECON_MISSING_COLUMN: u8 = 61;

/// Engine precondition failure (duplicate record ids) or serialization error.
pub const EXIT_RECON_RUNTIME: u8 = 62;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingField { .. } => EXIT_RECON_MISSING_COLUMN,
        ReconError::RowWidth { .. } => EXIT_CSV_PARSE,
        ReconError::DuplicateRecordId { .. } | ReconError::Serialize(_) => EXIT_RECON_RUNTIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gstrecon::Ledger;

    #[test]
    fn engine_errors_map_to_registry() {
        assert_eq!(
            recon_exit_code(&ReconError::ConfigParse("x".into())),
            EXIT_RECON_INVALID_CONFIG
        );
        assert_eq!(
            recon_exit_code(&ReconError::MissingField {
                ledger: Ledger::Source,
                field: "supplier_id",
                column: "GSTIN".into(),
            }),
            EXIT_RECON_MISSING_COLUMN
        );
        assert_eq!(
            recon_exit_code(&ReconError::RowWidth {
                ledger: Ledger::Reference,
                row: 3,
                expected: 7,
                found: 6,
            }),
            EXIT_CSV_PARSE
        );
        assert_eq!(
            recon_exit_code(&ReconError::DuplicateRecordId {
                ledger: Ledger::Source,
                id: "7".into(),
            }),
            EXIT_RECON_RUNTIME
        );
    }
}
