use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::audit::AuditEntry;
use crate::config::ToleranceConfig;
use crate::normalize::{Amounts, NormalizedKeys};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Which side of the reconciliation a table or record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ledger {
    /// Buyer-side purchase register (CIS).
    Source,
    /// Supplier-reported statement (GSTR-2B).
    Reference,
}

impl std::fmt::Display for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

/// A fully materialized table: one header row plus string cells.
#[derive(Debug, Clone, Default)]
pub struct LedgerTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LedgerTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Both tables of one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub source: LedgerTable,
    pub reference: LedgerTable,
}

/// One ledger line with its comparison keys and amounts already derived.
///
/// Built once per run from a table row through the resolved field mapping;
/// the matcher never looks at column names.
#[derive(Debug, Clone)]
pub struct LedgerRecord {
    pub id: String,
    pub supplier_raw: String,
    pub invoice_raw: String,
    pub date_raw: String,
    pub date: Option<NaiveDate>,
    pub amounts: Amounts,
    pub keys: NormalizedKeys,
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// The eight matching strategies, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Strict,
    GrandTotal,
    HighTolerance,
    NumericOnly,
    LastFourDigits,
    PanLevel,
    Fuzzy,
    ReverseClubbing,
}

impl Layer {
    pub const ALL: [Layer; 8] = [
        Layer::Strict,
        Layer::GrandTotal,
        Layer::HighTolerance,
        Layer::NumericOnly,
        Layer::LastFourDigits,
        Layer::PanLevel,
        Layer::Fuzzy,
        Layer::ReverseClubbing,
    ];

    /// Display name used in match categories, statistics and the audit log.
    pub fn name(self) -> &'static str {
        match self {
            Self::Strict => "Layer 1: Strict Match",
            Self::GrandTotal => "Layer 2: Grand Total Match",
            Self::HighTolerance => "Layer 3: High Tolerance",
            Self::NumericOnly => "Layer 4: Numeric Only",
            Self::LastFourDigits => "Layer 5: Last 4 Digits",
            Self::PanLevel => "Layer 6: PAN Level",
            Self::Fuzzy => "Layer 7: Fuzzy Match",
            Self::ReverseClubbing => "Layer 8: Reverse Clubbing",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Layer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Matching state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchStatus {
    Matched,
    Unmatched,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "Matched"),
            Self::Unmatched => write!(f, "Unmatched"),
        }
    }
}

/// Group key = (supplier id, entity prefix, basic invoice key).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub supplier_id: String,
    pub entity_prefix: String,
    pub invoice_basic: String,
}

/// Source records sharing one [`GroupKey`], summed. The unit of matching.
#[derive(Debug, Clone)]
pub struct ClubbedGroup {
    pub key: GroupKey,
    pub keys: NormalizedKeys,
    pub amounts: Amounts,
    /// Indices into the session's source records, in input order.
    pub members: Vec<usize>,
    pub member_ids: Vec<String>,
    pub invoice_raw: String,
    pub date_raw: String,
    pub date: Option<NaiveDate>,
    matched: bool,
}

impl ClubbedGroup {
    pub(crate) fn new(key: GroupKey, first: &LedgerRecord, index: usize) -> Self {
        Self {
            key,
            keys: first.keys.clone(),
            amounts: first.amounts,
            members: vec![index],
            member_ids: vec![first.id.clone()],
            invoice_raw: first.invoice_raw.clone(),
            date_raw: first.date_raw.clone(),
            date: first.date,
            matched: false,
        }
    }

    pub(crate) fn absorb(&mut self, record: &LedgerRecord, index: usize) {
        self.amounts += record.amounts;
        self.members.push(index);
        self.member_ids.push(record.id.clone());
    }

    pub fn is_matched(&self) -> bool {
        self.matched
    }

    /// One-way: a matched group is never reconsidered.
    pub(crate) fn mark_matched(&mut self) {
        self.matched = true;
    }
}

/// A successful layer attempt, before it is applied to the session.
#[derive(Debug, Clone)]
pub struct MatchCommit {
    pub layer: Layer,
    /// Index of the source group.
    pub group: usize,
    /// Indices of the reference rows consumed, in input order.
    pub references: Vec<usize>,
    pub difference_minor: i64,
    pub rationale: String,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerCount {
    pub layer: Layer,
    pub matched_groups: usize,
}

/// Matched-group count per layer, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LayerStatistics {
    entries: Vec<LayerCount>,
}

impl LayerStatistics {
    pub(crate) fn record(&mut self, layer: Layer, matched_groups: usize) {
        self.entries.push(LayerCount { layer, matched_groups });
    }

    pub fn get(&self, layer: Layer) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.layer == layer)
            .map(|e| e.matched_groups)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerCount> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.matched_groups).sum()
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub record_id: String,
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_category: Option<Layer>,
    pub cross_reference_ids: Vec<String>,
    pub short_remark: String,
    pub detailed_remark: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceOutcome {
    pub record_id: String,
    pub status: MatchStatus,
    pub cross_reference_ids: Vec<String>,
}

/// An input row with the engine's annotation attached.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedRow<T> {
    pub fields: Vec<String>,
    pub outcome: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedLedger<T> {
    pub headers: Vec<String>,
    pub rows: Vec<AnnotatedRow<T>>,
}

/// Hints on why unmatched source records failed to match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MismatchAnalysis {
    pub total_unmatched: usize,
    pub invoice_format_issues: usize,
    pub gstin_issues: usize,
    pub amount_issues: usize,
    pub time_barred: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub source_records: usize,
    pub source_matched: usize,
    pub source_unmatched: usize,
    pub match_rate_pct: f64,
    pub reference_records: usize,
    pub reference_matched: usize,
    pub reference_unmatched: usize,
    pub source_groups: usize,
    pub matched_groups: usize,
    pub time_barred: usize,
    pub analysis: MismatchAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub tolerance: ToleranceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub layer_stats: LayerStatistics,
    pub source: AnnotatedLedger<SourceOutcome>,
    pub reference: AnnotatedLedger<ReferenceOutcome>,
    pub audit: Vec<AuditEntry>,
}

impl ReconResult {
    pub fn to_json_pretty(&self) -> Result<String, crate::ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| crate::ReconError::Serialize(e.to_string()))
    }
}
