// Property-based tests for the matching engine.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashMap;

use gstrecon::model::MatchStatus;
use gstrecon::normalize::{
    basic_invoice_key, last4_invoice_key, numeric_invoice_key, parse_amount, parse_invoice_date,
    NormalizedKeys,
};
use gstrecon::{FieldMapping, LedgerTable, ReconConfig, ReconInput};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn mapping() -> FieldMapping {
    FieldMapping {
        record_id: None,
        supplier_id: "gstin".into(),
        invoice_number: "invoice".into(),
        invoice_date: "date".into(),
        taxable_amount: "taxable".into(),
        integrated_tax: "igst".into(),
        central_tax: "cgst".into(),
        state_tax: "sgst".into(),
    }
}

fn headers() -> Vec<String> {
    ["gstin", "invoice", "date", "taxable", "igst", "cgst", "sgst"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// A handful of suppliers, two of which share a PAN.
fn arb_gstin() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("27AAACX1234A1Z5".to_string()),
        Just("27AAACX1234A2Z4".to_string()),
        Just("29BBBCY5678B1Z1".to_string()),
        Just("".to_string()),
    ]
}

/// Invoice numbers drawn from a small space so collisions are common.
fn arb_invoice() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => r"(INV|inv|GST)[-/ ]?0{0,2}[1-9][0-9]{0,3}",
        1 => r"[0-9]{1,6}",
        1 => r"[A-Z]{0,2}",
    ]
}

fn arb_amount() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (0i64..20_000, 0i64..100).prop_map(|(r, p)| format!("{r}.{p:02}")),
        1 => Just("".to_string()),
        1 => Just("n/a".to_string()),
    ]
}

fn arb_date() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..=28, 1u32..=12, 2023i32..=2025).prop_map(|(d, m, y)| format!("{d:02}/{m:02}/{y}")),
        Just("".to_string()),
    ]
}

fn arb_row() -> impl Strategy<Value = Vec<String>> {
    (arb_gstin(), arb_invoice(), arb_date(), arb_amount(), arb_amount(), arb_amount())
        .prop_map(|(g, i, d, t, igst, cgst)| vec![g, i, d, t, igst, cgst, String::new()])
}

fn arb_input(max: usize) -> impl Strategy<Value = ReconInput> {
    (
        prop::collection::vec(arb_row(), 0..max),
        prop::collection::vec(arb_row(), 0..max),
    )
        .prop_map(|(s, r)| ReconInput {
            source: LedgerTable::new(headers(), s),
            reference: LedgerTable::new(headers(), r),
        })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn every_record_has_exactly_one_outcome(input in arb_input(24)) {
        let config = ReconConfig::with_mappings("prop", mapping(), mapping());
        let result = gstrecon::run(&config, &input).unwrap();
        let s = &result.summary;

        prop_assert_eq!(result.source.rows.len(), input.source.len());
        prop_assert_eq!(s.source_matched + s.source_unmatched, input.source.len());
        prop_assert_eq!(s.matched_groups, result.layer_stats.total());
        prop_assert_eq!(s.matched_groups, result.audit.len());

        for row in &result.source.rows {
            let o = &row.outcome;
            prop_assert_eq!(o.status == MatchStatus::Matched, o.match_category.is_some());
            prop_assert_eq!(o.status == MatchStatus::Matched, !o.cross_reference_ids.is_empty());
        }

        // Each reference row is consumed by at most one commit, and exactly the
        // consumed rows are marked matched.
        let mut consumed: HashMap<&str, usize> = HashMap::new();
        for entry in &result.audit {
            for id in &entry.reference_ids {
                *consumed.entry(id.as_str()).or_default() += 1;
            }
        }
        prop_assert!(consumed.values().all(|&n| n == 1));
        for row in &result.reference.rows {
            let o = &row.outcome;
            prop_assert_eq!(
                o.status == MatchStatus::Matched,
                consumed.contains_key(o.record_id.as_str())
            );
        }
    }

    #[test]
    fn identical_input_gives_identical_outcome(input in arb_input(16)) {
        let config = ReconConfig::with_mappings("prop", mapping(), mapping());
        let a = gstrecon::run(&config, &input).unwrap();
        let b = gstrecon::run(&config, &input).unwrap();

        for (x, y) in a.source.rows.iter().zip(&b.source.rows) {
            prop_assert_eq!(&x.outcome, &y.outcome);
        }
        for (x, y) in a.reference.rows.iter().zip(&b.reference.rows) {
            prop_assert_eq!(&x.outcome, &y.outcome);
        }
        prop_assert_eq!(a.audit.len(), b.audit.len());
        for (x, y) in a.audit.iter().zip(&b.audit) {
            prop_assert!(x.same_content(y));
        }
    }

    #[test]
    fn normalizers_are_total(raw in r"\PC{0,24}") {
        let keys = NormalizedKeys::derive(&raw, &raw);
        prop_assert!(keys.entity_prefix.chars().count() <= 10);
        prop_assert!(keys.invoice_numeric.chars().all(|c| c.is_ascii_digit()));
        prop_assert!(!keys.invoice_numeric.starts_with('0'));
        prop_assert!(keys.invoice_last4.chars().count() <= 4);
        let _ = parse_amount(&raw);
        let _ = parse_invoice_date(&raw);
    }

    #[test]
    fn invoice_keys_are_idempotent(raw in r"[ -~]{0,20}") {
        let basic = basic_invoice_key(&raw);
        prop_assert_eq!(basic_invoice_key(&basic), basic.clone());
        let numeric = numeric_invoice_key(&raw);
        prop_assert_eq!(numeric_invoice_key(&numeric), numeric.clone());
        prop_assert!(last4_invoice_key(&raw).chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn plain_amounts_parse_exactly(rupees in 0i64..10_000_000, paise in 0i64..100) {
        let raw = format!("₹ {rupees}.{paise:02}");
        prop_assert_eq!(parse_amount(&raw), rupees * 100 + paise);
    }
}
