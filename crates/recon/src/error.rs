use std::fmt;

use crate::model::Ledger;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (negative tolerance, empty column name, etc.).
    ConfigValidation(String),
    /// A mapped field names a column the table does not have.
    MissingField { ledger: Ledger, field: &'static str, column: String },
    /// Two rows of one ledger carry the same record id.
    DuplicateRecordId { ledger: Ledger, id: String },
    /// A data row is wider or narrower than the header row.
    RowWidth { ledger: Ledger, row: usize, expected: usize, found: usize },
    /// Result serialization error.
    Serialize(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingField { ledger, field, column } => {
                write!(f, "{ledger} ledger: field '{field}' mapped to missing column '{column}'")
            }
            Self::DuplicateRecordId { ledger, id } => {
                write!(f, "{ledger} ledger: duplicate record id '{id}'")
            }
            Self::RowWidth { ledger, row, expected, found } => {
                write!(f, "{ledger} ledger, row {row}: expected {expected} fields, found {found}")
            }
            Self::Serialize(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_ledger_and_column() {
        let err = ReconError::MissingField {
            ledger: Ledger::Reference,
            field: "invoice_number",
            column: "Invoice No".into(),
        };
        assert_eq!(
            err.to_string(),
            "reference ledger: field 'invoice_number' mapped to missing column 'Invoice No'"
        );
    }
}
