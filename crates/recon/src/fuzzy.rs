//! Layer 7: similarity on the basic invoice key, gated by grand total.

use crate::config::ToleranceConfig;
use crate::matcher::dates_coincide;
use crate::model::{Layer, MatchCommit};
use crate::normalize::{format_minor, is_usable_key};
use crate::session::ReconSession;

/// Keys shorter than this are too short for a similarity score to mean much.
pub const FUZZY_MIN_KEY_LEN: usize = 3;

/// Normalized Levenshtein similarity as an integer percentage (0-100),
/// rounded half away from zero.
pub fn similarity(a: &str, b: &str) -> u8 {
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
}

/// Run layer 7. Returns the matched-group count.
///
/// Candidates share the group's exact supplier id and pass the standard
/// grand-total tolerance before any string comparison happens. The best score
/// strictly above `threshold` wins; ties go to the earlier reference row.
pub fn run_fuzzy_layer(session: &mut ReconSession, tolerance: &ToleranceConfig, threshold: u8) -> usize {
    let tol = tolerance.standard_minor;
    let mut count = 0;

    for g in 0..session.groups().len() {
        if let Some(commit) = find_fuzzy_match(session, g, tol, threshold) {
            session.commit(commit);
            count += 1;
        }
    }

    count
}

fn find_fuzzy_match(session: &ReconSession, g: usize, tol: i64, threshold: u8) -> Option<MatchCommit> {
    let group = session.group(g);
    if group.is_matched() {
        return None;
    }
    let key = &group.keys.invoice_basic;
    if key.chars().count() < FUZZY_MIN_KEY_LEN || !is_usable_key(&group.keys.supplier_id) {
        return None;
    }

    let mut best: Option<(usize, u8)> = None;
    for r in session.supplier_candidates(&group.keys.supplier_id) {
        let reference = session.reference_record(r);
        if (group.amounts.grand_total - reference.amounts.grand_total).abs() > tol {
            continue;
        }
        let score = similarity(key, &reference.keys.invoice_basic);
        if score > threshold && best.map_or(true, |(_, s)| score > s) {
            best = Some((r, score));
        }
    }

    let (r, score) = best?;
    let reference = session.reference_record(r);
    let difference_minor = group.amounts.grand_total - reference.amounts.grand_total;

    let mut matched = format!("Matched: GSTIN, Grand Total (Diff: ₹{})", format_minor(difference_minor.abs()));
    if dates_coincide(group.date, reference.date) {
        matched.push_str(", Date");
    }

    Some(MatchCommit {
        layer: Layer::Fuzzy,
        group: g,
        references: vec![r],
        difference_minor,
        rationale: format!(
            "{matched} | Fuzzy Invoice: '{}' vs '{}' (Similarity: {score}%)",
            group.invoice_raw, reference.invoice_raw
        ),
    })
}
