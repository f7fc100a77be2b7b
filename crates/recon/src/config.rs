use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::Ledger;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub layers: LayerConfig,
    #[serde(default)]
    pub time_barred: TimeBarredConfig,
    pub source: LedgerConfig,
    pub reference: LedgerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    pub file: String,
    pub columns: FieldMapping,
}

/// Field → column names. Resolved against the table headers once, before any
/// layer runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMapping {
    /// Stable id column. Ids are synthesized from row order when absent.
    #[serde(default)]
    pub record_id: Option<ColumnNames>,
    pub supplier_id: ColumnNames,
    pub invoice_number: ColumnNames,
    pub invoice_date: ColumnNames,
    pub taxable_amount: ColumnNames,
    pub integrated_tax: ColumnNames,
    pub central_tax: ColumnNames,
    pub state_tax: ColumnNames,
}

impl FieldMapping {
    /// (field name, columns) for every required field.
    pub fn required(&self) -> [(&'static str, &ColumnNames); 7] {
        [
            ("supplier_id", &self.supplier_id),
            ("invoice_number", &self.invoice_number),
            ("invoice_date", &self.invoice_date),
            ("taxable_amount", &self.taxable_amount),
            ("integrated_tax", &self.integrated_tax),
            ("central_tax", &self.central_tax),
            ("state_tax", &self.state_tax),
        ]
    }
}

/// Accepted header names for one field, tried in order. Written in TOML as a
/// single string or a list:
///
/// ```toml
/// supplier_id = ["GSTIN of supplier", "Supplier GSTIN", "GSTIN"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "OneOrMany", into = "OneOrMany")]
pub struct ColumnNames(Vec<String>);

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for ColumnNames {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(name) => Self(vec![name]),
            OneOrMany::Many(names) => Self(names),
        }
    }
}

impl From<ColumnNames> for OneOrMany {
    fn from(mut value: ColumnNames) -> Self {
        if value.0.len() == 1 {
            OneOrMany::One(value.0.remove(0))
        } else {
            OneOrMany::Many(value.0)
        }
    }
}

impl ColumnNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// No names at all, or a name that is only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty() || self.0.iter().any(|n| n.trim().is_empty())
    }
}

impl From<&str> for ColumnNames {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for ColumnNames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl PartialEq<&str> for ColumnNames {
    fn eq(&self, other: &&str) -> bool {
        self.0.len() == 1 && self.0[0] == *other
    }
}

impl fmt::Display for ColumnNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" | "))
    }
}

// ---------------------------------------------------------------------------
// Tolerance + layers + time-barred + output
// ---------------------------------------------------------------------------

/// Absolute amount tolerances, in minor currency units (paise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToleranceConfig {
    /// Layers 1, 2, 4-8.
    #[serde(default = "default_standard_minor")]
    pub standard_minor: i64,
    /// Layer 3.
    #[serde(default = "default_high_minor")]
    pub high_minor: i64,
}

fn default_standard_minor() -> i64 {
    200
}

fn default_high_minor() -> i64 {
    5000
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            standard_minor: default_standard_minor(),
            high_minor: default_high_minor(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerConfig {
    #[serde(default = "default_true")]
    pub fuzzy: bool,
    #[serde(default = "default_true")]
    pub reverse_clubbing: bool,
    /// Layer 7 similarity must be strictly greater than this.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: u8,
}

fn default_true() -> bool {
    true
}

fn default_fuzzy_threshold() -> u8 {
    85
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            fuzzy: true,
            reverse_clubbing: true,
            fuzzy_threshold: default_fuzzy_threshold(),
        }
    }
}

/// Advisory flag for invoices dated strictly before `cutoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeBarredConfig {
    #[serde(default = "default_cutoff")]
    pub cutoff: NaiveDate,
}

fn default_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 31).unwrap_or_default()
}

impl Default for TimeBarredConfig {
    fn default() -> Self {
        Self { cutoff: default_cutoff() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with default tolerances and layers around two column mappings.
    pub fn with_mappings(name: &str, source: FieldMapping, reference: FieldMapping) -> Self {
        Self {
            name: name.to_string(),
            tolerance: ToleranceConfig::default(),
            layers: LayerConfig::default(),
            time_barred: TimeBarredConfig::default(),
            source: LedgerConfig { file: String::new(), columns: source },
            reference: LedgerConfig { file: String::new(), columns: reference },
            output: OutputConfig::default(),
        }
    }

    pub fn ledger(&self, ledger: Ledger) -> &LedgerConfig {
        match ledger {
            Ledger::Source => &self.source,
            Ledger::Reference => &self.reference,
        }
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.tolerance.standard_minor < 0 {
            return Err(ReconError::ConfigValidation(format!(
                "tolerance.standard_minor must be non-negative, got {}",
                self.tolerance.standard_minor
            )));
        }
        if self.tolerance.high_minor < 0 {
            return Err(ReconError::ConfigValidation(format!(
                "tolerance.high_minor must be non-negative, got {}",
                self.tolerance.high_minor
            )));
        }
        if self.layers.fuzzy_threshold > 100 {
            return Err(ReconError::ConfigValidation(format!(
                "layers.fuzzy_threshold must be 0..=100, got {}",
                self.layers.fuzzy_threshold
            )));
        }

        for ledger in [Ledger::Source, Ledger::Reference] {
            let columns = &self.ledger(ledger).columns;
            for (field, column) in columns.required() {
                if column.is_blank() {
                    return Err(ReconError::ConfigValidation(format!(
                        "{ledger}.columns.{field} must not be empty"
                    )));
                }
            }
            if columns.record_id.as_ref().is_some_and(ColumnNames::is_blank) {
                return Err(ReconError::ConfigValidation(format!(
                    "{ledger}.columns.record_id must not be empty when set"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "FY24 ITC"

[tolerance]
standard_minor = 100
high_minor = 2500

[source]
file = "cis.csv"

[source.columns]
record_id      = "Index CIS"
supplier_id    = "GSTIN of Supplier"
invoice_number = "Invoice Number"
invoice_date   = "Invoice Date"
taxable_amount = "Taxable Value"
integrated_tax = "IGST"
central_tax    = "CGST"
state_tax      = "SGST"

[reference]
file = "gstr2b.csv"

[reference.columns]
supplier_id    = "GSTIN"
invoice_number = "Invoice No"
invoice_date   = "Invoice Date"
taxable_amount = "Taxable Value"
integrated_tax = "Integrated Tax"
central_tax    = "Central Tax"
state_tax      = "State/UT Tax"
"#;

    #[test]
    fn parse_valid() {
        let config = ReconConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "FY24 ITC");
        assert_eq!(config.tolerance.standard_minor, 100);
        assert_eq!(config.tolerance.high_minor, 2500);
        assert_eq!(config.source.columns.record_id, Some("Index CIS".into()));
        assert!(config.reference.columns.record_id.is_none());
        assert_eq!(config.reference.columns.state_tax, "State/UT Tax");
    }

    #[test]
    fn defaults_applied() {
        let input = VALID.replace("[tolerance]\nstandard_minor = 100\nhigh_minor = 2500\n", "");
        let config = ReconConfig::from_toml(&input).unwrap();
        assert_eq!(config.tolerance, ToleranceConfig { standard_minor: 200, high_minor: 5000 });
        assert!(config.layers.fuzzy);
        assert!(config.layers.reverse_clubbing);
        assert_eq!(config.layers.fuzzy_threshold, 85);
        assert_eq!(config.time_barred.cutoff, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert!(config.output.dir.is_none());
    }

    #[test]
    fn parse_layers_and_cutoff() {
        let input = format!(
            r#"{VALID}
[layers]
fuzzy = false
fuzzy_threshold = 90

[time_barred]
cutoff = "2023-03-31"
"#
        );
        let config = ReconConfig::from_toml(&input).unwrap();
        assert!(!config.layers.fuzzy);
        assert!(config.layers.reverse_clubbing);
        assert_eq!(config.layers.fuzzy_threshold, 90);
        assert_eq!(config.time_barred.cutoff.to_string(), "2023-03-31");
    }

    #[test]
    fn reject_negative_tolerance() {
        let input = VALID.replace("high_minor = 2500", "high_minor = -1");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("high_minor must be non-negative"));
    }

    #[test]
    fn reject_missing_mapping_entry() {
        let input = VALID.replace("central_tax    = \"CGST\"\n", "");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
        assert!(err.to_string().contains("central_tax"));
    }

    #[test]
    fn reject_empty_column_name() {
        let input = VALID.replace("invoice_number = \"Invoice No\"", "invoice_number = \" \"");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("reference.columns.invoice_number"));
    }

    #[test]
    fn reject_unknown_key() {
        let input = VALID.replace("[tolerance]", "[tolerance]\nstandard = 2.0");
        assert!(ReconConfig::from_toml(&input).is_err(), "typo in tolerance should fail");
    }

    #[test]
    fn reject_threshold_over_100() {
        let input = format!("{VALID}\n[layers]\nfuzzy_threshold = 101\n");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("fuzzy_threshold"));
    }

    #[test]
    fn column_accepts_list_of_names() {
        let input = VALID.replace(
            "supplier_id    = \"GSTIN\"",
            "supplier_id    = [\"GSTIN of supplier\", \"Supplier GSTIN\", \"GSTIN\"]",
        );
        let config = ReconConfig::from_toml(&input).unwrap();
        assert_eq!(
            config.reference.columns.supplier_id.names(),
            ["GSTIN of supplier", "Supplier GSTIN", "GSTIN"]
        );
        assert_eq!(config.reference.columns.invoice_number, "Invoice No");
    }

    #[test]
    fn reject_empty_column_list() {
        let input = VALID.replace("invoice_number = \"Invoice No\"", "invoice_number = []");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("reference.columns.invoice_number"));

        let input = VALID.replace("invoice_number = \"Invoice No\"", "invoice_number = [\"Invoice No\", \"\"]");
        assert!(ReconConfig::from_toml(&input).is_err());
    }

    #[test]
    fn column_names_display_in_order() {
        let names = ColumnNames::new(["Invoice number", "Invoice No"]);
        assert_eq!(names.to_string(), "Invoice number | Invoice No");
        assert_ne!(names, "Invoice number");
    }
}
