//! Layers 1-6: exact-key matching with progressively looser keys.
//!
//! Each layer walks the unmatched groups in input order and commits the first
//! candidate (in reference input order) that passes its amount rule. No
//! backtracking: a rejected candidate is never revisited by the same layer.

use chrono::NaiveDate;

use crate::config::ToleranceConfig;
use crate::model::{ClubbedGroup, Layer, LedgerRecord, MatchCommit};
use crate::normalize::{format_minor, is_usable_key, NormalizedKeys};
use crate::session::ReconSession;

/// Which invoice-number variant a layer joins on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvoiceKeyKind {
    Basic,
    Numeric,
    LastFour,
}

impl InvoiceKeyKind {
    pub fn of(self, keys: &NormalizedKeys) -> &str {
        match self {
            Self::Basic => &keys.invoice_basic,
            Self::Numeric => &keys.invoice_numeric,
            Self::LastFour => &keys.invoice_last4,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Basic => "Invoice Number",
            Self::Numeric => "Numeric Invoice",
            Self::LastFour => "Last 4 Digits",
        }
    }
}

/// Exact GSTIN, or PAN-level (first ten characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplierScope {
    Exact,
    EntityPrefix,
}

impl SupplierScope {
    pub fn of(self, keys: &NormalizedKeys) -> &str {
        match self {
            Self::Exact => &keys.supplier_id,
            Self::EntityPrefix => &keys.entity_prefix,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Exact => "GSTIN",
            Self::EntityPrefix => "PAN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountRule {
    /// Taxable and tax each within tolerance.
    TaxSplit,
    /// Grand total within tolerance.
    GrandTotal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToleranceLevel {
    Standard,
    High,
}

impl ToleranceLevel {
    pub fn resolve(self, tolerance: &ToleranceConfig) -> i64 {
        match self {
            Self::Standard => tolerance.standard_minor,
            Self::High => tolerance.high_minor,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LayerSpec {
    pub layer: Layer,
    pub invoice_key: InvoiceKeyKind,
    pub supplier_scope: SupplierScope,
    pub rule: AmountRule,
    pub tolerance: ToleranceLevel,
}

pub const STANDARD_LAYERS: [LayerSpec; 6] = [
    LayerSpec {
        layer: Layer::Strict,
        invoice_key: InvoiceKeyKind::Basic,
        supplier_scope: SupplierScope::Exact,
        rule: AmountRule::TaxSplit,
        tolerance: ToleranceLevel::Standard,
    },
    LayerSpec {
        layer: Layer::GrandTotal,
        invoice_key: InvoiceKeyKind::Basic,
        supplier_scope: SupplierScope::Exact,
        rule: AmountRule::GrandTotal,
        tolerance: ToleranceLevel::Standard,
    },
    LayerSpec {
        layer: Layer::HighTolerance,
        invoice_key: InvoiceKeyKind::Basic,
        supplier_scope: SupplierScope::Exact,
        rule: AmountRule::GrandTotal,
        tolerance: ToleranceLevel::High,
    },
    LayerSpec {
        layer: Layer::NumericOnly,
        invoice_key: InvoiceKeyKind::Numeric,
        supplier_scope: SupplierScope::Exact,
        rule: AmountRule::GrandTotal,
        tolerance: ToleranceLevel::Standard,
    },
    LayerSpec {
        layer: Layer::LastFourDigits,
        invoice_key: InvoiceKeyKind::LastFour,
        supplier_scope: SupplierScope::Exact,
        rule: AmountRule::GrandTotal,
        tolerance: ToleranceLevel::Standard,
    },
    LayerSpec {
        layer: Layer::PanLevel,
        invoice_key: InvoiceKeyKind::Basic,
        supplier_scope: SupplierScope::EntityPrefix,
        rule: AmountRule::GrandTotal,
        tolerance: ToleranceLevel::Standard,
    },
];

/// Run one of layers 1-6 over the session. Returns the matched-group count.
pub fn run_standard_layer(
    session: &mut ReconSession,
    spec: &LayerSpec,
    tolerance: &ToleranceConfig,
) -> usize {
    let tol = spec.tolerance.resolve(tolerance);
    let mut count = 0;

    for g in 0..session.groups().len() {
        if let Some(commit) = find_standard_match(session, g, spec, tol) {
            session.commit(commit);
            count += 1;
        }
    }

    count
}

fn find_standard_match(
    session: &ReconSession,
    g: usize,
    spec: &LayerSpec,
    tol: i64,
) -> Option<MatchCommit> {
    let group = session.group(g);
    if group.is_matched() {
        return None;
    }

    let key = spec.invoice_key.of(&group.keys);
    let supplier = spec.supplier_scope.of(&group.keys);
    if !is_usable_key(key) || !is_usable_key(supplier) {
        return None;
    }

    session
        .keyed_candidates(spec.supplier_scope, spec.invoice_key, supplier, key)
        .find(|&r| amounts_agree(spec.rule, group, session.reference_record(r), tol))
        .map(|r| {
            let reference = session.reference_record(r);
            MatchCommit {
                layer: spec.layer,
                group: g,
                references: vec![r],
                difference_minor: group.amounts.grand_total - reference.amounts.grand_total,
                rationale: describe_standard(spec, group, reference),
            }
        })
}

fn amounts_agree(rule: AmountRule, group: &ClubbedGroup, reference: &LedgerRecord, tol: i64) -> bool {
    let a = &group.amounts;
    let b = &reference.amounts;
    match rule {
        AmountRule::TaxSplit => (a.taxable - b.taxable).abs() <= tol && (a.tax - b.tax).abs() <= tol,
        AmountRule::GrandTotal => (a.grand_total - b.grand_total).abs() <= tol,
    }
}

fn describe_standard(spec: &LayerSpec, group: &ClubbedGroup, reference: &LedgerRecord) -> String {
    let a = &group.amounts;
    let b = &reference.amounts;

    let mut parts = vec![
        spec.supplier_scope.label().to_string(),
        format!(
            "{} ({} vs {})",
            spec.invoice_key.label(),
            group.invoice_raw,
            reference.invoice_raw
        ),
    ];
    match spec.rule {
        AmountRule::TaxSplit => {
            parts.push(format!("Taxable Value (Diff: ₹{})", format_minor((a.taxable - b.taxable).abs())));
            parts.push(format!("Tax Amount (Diff: ₹{})", format_minor((a.tax - b.tax).abs())));
        }
        AmountRule::GrandTotal => {
            parts.push(format!(
                "Grand Total (Diff: ₹{})",
                format_minor((a.grand_total - b.grand_total).abs())
            ));
        }
    }
    if dates_coincide(group.date, reference.date) {
        parts.push("Date".to_string());
    }

    let mut detail = format!("Matched: {}", parts.join(", "));
    if spec.supplier_scope == SupplierScope::EntityPrefix
        && group.keys.supplier_id != reference.keys.supplier_id
    {
        detail.push_str(&format!(
            " | Note: Matched under different GSTIN {}",
            reference.keys.supplier_id
        ));
    }
    detail
}

/// Informational only: both dates known and equal.
pub(crate) fn dates_coincide(a: Option<NaiveDate>, b: Option<NaiveDate>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}
