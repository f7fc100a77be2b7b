//! Clubbing: summing lines that share a supplier and invoice key.

use std::collections::HashMap;

use crate::model::{ClubbedGroup, GroupKey, LedgerRecord};

/// Group source records by (supplier id, entity prefix, basic invoice key).
///
/// Groups come out in order of first appearance; members keep input order and
/// the first member supplies the representative invoice number and date.
pub fn club_source_records(records: &[LedgerRecord]) -> Vec<ClubbedGroup> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<ClubbedGroup> = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let key = GroupKey {
            supplier_id: record.keys.supplier_id.clone(),
            entity_prefix: record.keys.entity_prefix.clone(),
            invoice_basic: record.keys.invoice_basic.clone(),
        };
        match index.get(&key) {
            Some(&g) => groups[g].absorb(record, i),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(ClubbedGroup::new(key, record, i));
            }
        }
    }

    groups
}

/// Reference rows sharing (supplier id, basic invoice key), for reverse clubbing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceGroup {
    pub supplier_id: String,
    pub invoice_basic: String,
    pub grand_total: i64,
    /// Indices into the reference records, in input order.
    pub members: Vec<usize>,
}

/// Group the reference rows selected by `include`, keyed on
/// (supplier id, basic invoice key). Lookup is by that key pair.
pub fn club_reference_rows(
    records: &[LedgerRecord],
    include: impl Fn(usize) -> bool,
) -> HashMap<(String, String), ReferenceGroup> {
    let mut groups: HashMap<(String, String), ReferenceGroup> = HashMap::new();

    for (i, record) in records.iter().enumerate().filter(|(i, _)| include(*i)) {
        let key = (record.keys.supplier_id.clone(), record.keys.invoice_basic.clone());
        let group = groups.entry(key).or_insert_with(|| ReferenceGroup {
            supplier_id: record.keys.supplier_id.clone(),
            invoice_basic: record.keys.invoice_basic.clone(),
            grand_total: 0,
            members: Vec::new(),
        });
        group.grand_total += record.amounts.grand_total;
        group.members.push(i);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Amounts, NormalizedKeys};

    fn rec(id: &str, gstin: &str, inv: &str, taxable: i64, igst: i64) -> LedgerRecord {
        LedgerRecord {
            id: id.into(),
            supplier_raw: gstin.into(),
            invoice_raw: inv.into(),
            date_raw: String::new(),
            date: None,
            amounts: Amounts::from_components(taxable, igst, 0, 0),
            keys: NormalizedKeys::derive(gstin, inv),
        }
    }

    #[test]
    fn split_lines_are_summed() {
        let records = vec![
            rec("1", "27AAACX1234A1Z5", "INV-001", 600_000, 108_000),
            rec("2", "27AAACX1234A1Z5", "inv/001", 400_000, 72_000),
        ];
        let groups = club_source_records(&records);
        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert_eq!(g.amounts.taxable, 1_000_000);
        assert_eq!(g.amounts.tax, 180_000);
        assert_eq!(g.amounts.grand_total, 1_180_000);
        assert_eq!(g.member_ids, vec!["1", "2"]);
        assert_eq!(g.members, vec![0, 1]);
        assert_eq!(g.invoice_raw, "INV-001");
        assert!(!g.is_matched());
    }

    #[test]
    fn first_appearance_order() {
        let records = vec![
            rec("1", "29BBB", "Z-9", 100, 0),
            rec("2", "27AAA", "A-1", 100, 0),
            rec("3", "29BBB", "Z9", 100, 0),
        ];
        let groups = club_source_records(&records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key.invoice_basic, "Z9");
        assert_eq!(groups[0].member_ids, vec!["1", "3"]);
        assert_eq!(groups[1].key.supplier_id, "27AAA");
    }

    #[test]
    fn different_suppliers_never_club() {
        let records = vec![
            rec("1", "27AAACX1234A1Z5", "INV-1", 100, 0),
            rec("2", "27AAACX1234A2Z4", "INV-1", 100, 0),
        ];
        assert_eq!(club_source_records(&records).len(), 2);
    }

    #[test]
    fn reference_rows_clubbed_with_filter() {
        let records = vec![
            rec("100000", "27AAA", "X-1", 400_000, 50_000),
            rec("100001", "27AAA", "X1", 400_000, 50_000),
            rec("100002", "27AAA", "X1", 1, 0),
        ];
        let groups = club_reference_rows(&records, |i| i != 2);
        assert_eq!(groups.len(), 1);
        let g = &groups[&("27AAA".to_string(), "X1".to_string())];
        assert_eq!(g.grand_total, 900_000);
        assert_eq!(g.members, vec![0, 1]);
    }
}
