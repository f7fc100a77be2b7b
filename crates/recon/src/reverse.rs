//! Layer 8: one source group against several reference rows.

use crate::aggregate::club_reference_rows;
use crate::config::ToleranceConfig;
use crate::model::{Layer, MatchCommit};
use crate::normalize::{format_minor, is_usable_key};
use crate::session::ReconSession;

/// Run layer 8. Returns the matched-group count.
///
/// Reference rows still unmatched are clubbed once, up front, by
/// (supplier id, basic invoice key). Each unmatched source group looks up its
/// own key pair and commits against every member when the summed grand totals
/// agree within the standard tolerance.
pub fn run_reverse_clubbing(session: &mut ReconSession, tolerance: &ToleranceConfig) -> usize {
    let tol = tolerance.standard_minor;
    let reference_groups =
        club_reference_rows(session.reference_records(), |r| session.is_reference_unmatched(r));
    let mut count = 0;

    for g in 0..session.groups().len() {
        let group = session.group(g);
        if group.is_matched()
            || !is_usable_key(&group.keys.supplier_id)
            || !is_usable_key(&group.keys.invoice_basic)
        {
            continue;
        }

        let key = (group.keys.supplier_id.clone(), group.keys.invoice_basic.clone());
        let Some(candidate) = reference_groups.get(&key) else {
            continue;
        };
        if !candidate.members.iter().all(|&r| session.is_reference_unmatched(r)) {
            continue;
        }

        let difference_minor = group.amounts.grand_total - candidate.grand_total;
        if difference_minor.abs() > tol {
            continue;
        }

        let commit = MatchCommit {
            layer: Layer::ReverseClubbing,
            group: g,
            references: candidate.members.clone(),
            difference_minor,
            rationale: format!(
                "Matched: GSTIN, Invoice Number | Reverse Clubbing: 1 CIS vs {} G2B Records (Total Diff: ₹{})",
                candidate.members.len(),
                format_minor(difference_minor.abs())
            ),
        };
        session.commit(commit);
        count += 1;
    }

    count
}
