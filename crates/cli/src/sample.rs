//! `gstrecon sample`: deterministic synthetic CIS and GSTR-2B ledgers.
//!
//! Every base invoice lands in one variation bucket, chosen so that each
//! matching layer has something to find:
//!
//! | Draw        | GSTR-2B side                           | Expected layer |
//! |-------------|----------------------------------------|----------------|
//! | < 0.55      | identical                              | 1              |
//! | 0.55 - 0.60 | split into 2-3 rows, same invoice      | 8              |
//! | 0.60 - 0.70 | taxable value off by up to ₹30         | 1, 2 or 3      |
//! | 0.70 - 0.80 | invoice prefixed with INV/, GST/, BIL/ | 4              |
//! | 0.80 - 0.90 | one-character typo in the invoice      | 7              |
//! | ≥ 0.90      | GSTIN entity code changed              | 6              |
//!
//! On top of that, 15% extra CIS-only invoices stay unmatched and a handful of
//! CIS-only invoices are dated before the time-barred cutoff.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::exit_codes::EXIT_USAGE;
use crate::CliError;

pub const MAX_RECORDS: usize = 1000;

pub const CIS_FILE: &str = "cis.csv";
pub const GSTR2B_FILE: &str = "gstr2b.csv";
pub const CONFIG_FILE: &str = "recon.toml";

const CIS_HEADERS: [&str; 7] = [
    "SupplierGSTIN",
    "DocumentNumber",
    "DocumentDate",
    "TaxableValue",
    "IntegratedTaxAmount",
    "CentralTaxAmount",
    "StateUT TaxAmount",
];

const GSTR2B_HEADERS: [&str; 7] = [
    "GSTIN of supplier",
    "Invoice number",
    "Invoice Date",
    "Taxable Value (₹)",
    "Integrated Tax(₹)",
    "Central Tax(₹)",
    "State/UT Tax(₹)",
];

/// Config matching the generated files. Each GSTR-2B field lists the names
/// portal exports are known to use; they resolve through header normalization.
pub const SAMPLE_CONFIG: &str = r#"name = "Sample ITC reconciliation"

[tolerance]
standard_minor = 200
high_minor = 5000

[layers]
fuzzy = true
reverse_clubbing = true
fuzzy_threshold = 85

[time_barred]
cutoff = "2024-03-31"

[source]
file = "cis.csv"

[source.columns]
supplier_id    = "SupplierGSTIN"
invoice_number = "DocumentNumber"
invoice_date   = "DocumentDate"
taxable_amount = "TaxableValue"
integrated_tax = "IntegratedTaxAmount"
central_tax    = "CentralTaxAmount"
state_tax      = "StateUT TaxAmount"

[reference]
file = "gstr2b.csv"

[reference.columns]
supplier_id    = ["GSTIN of supplier", "Supplier GSTIN", "GSTIN"]
invoice_number = ["Invoice number", "Invoice No"]
invoice_date   = ["Invoice Date", "Date"]
taxable_amount = ["Taxable Value", "Taxable"]
integrated_tax = ["Integrated Tax", "IGST"]
central_tax    = ["Central Tax", "CGST"]
state_tax      = ["State/UT Tax", "SGST"]

[output]
dir = "out"
"#;

/// Buyer's home state; suppliers elsewhere charge IGST.
const HOME_STATE: &str = "27";
const STATE_CODES: [&str; 6] = ["27", "29", "07", "33", "24", "09"];
const STATE_TAGS: [&str; 6] = ["MH", "KA", "DL", "TN", "GJ", "UP"];
const TAX_RATES_PCT: [i64; 4] = [5, 12, 18, 28];
const NUMERIC_PREFIXES: [&str; 3] = ["INV/", "GST/", "BIL/"];
const ALPHA: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Supplier {
    gstin: String,
    state: usize,
}

impl Supplier {
    /// Same PAN, different entity code (13th character).
    fn sibling_gstin(&self) -> String {
        let mut chars: Vec<char> = self.gstin.chars().collect();
        chars[12] = if chars[12] == '1' { '2' } else { '1' };
        chars.into_iter().collect()
    }

    fn is_interstate(&self) -> bool {
        STATE_CODES[self.state] != HOME_STATE
    }
}

/// Invoice amounts in paise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Money {
    taxable: i64,
    igst: i64,
    cgst: i64,
    sgst: i64,
}

impl Money {
    #[cfg(test)]
    fn grand_total(&self) -> i64 {
        self.taxable + self.igst + self.cgst + self.sgst
    }

    /// Split into `parts` pieces whose components sum back exactly.
    fn split(&self, parts: usize, rng: &mut StdRng) -> Vec<Money> {
        let weights: Vec<i64> = (0..parts).map(|_| rng.gen_range(20..=50)).collect();
        let total: i64 = weights.iter().sum();
        let share = |amount: i64, w: i64| amount * w / total;

        let mut pieces: Vec<Money> = weights
            .iter()
            .map(|&w| Money {
                taxable: share(self.taxable, w),
                igst: share(self.igst, w),
                cgst: share(self.cgst, w),
                sgst: share(self.sgst, w),
            })
            .collect();

        let sum = pieces.iter().fold(Money { taxable: 0, igst: 0, cgst: 0, sgst: 0 }, |a, p| Money {
            taxable: a.taxable + p.taxable,
            igst: a.igst + p.igst,
            cgst: a.cgst + p.cgst,
            sgst: a.sgst + p.sgst,
        });
        if let Some(last) = pieces.last_mut() {
            last.taxable += self.taxable - sum.taxable;
            last.igst += self.igst - sum.igst;
            last.cgst += self.cgst - sum.cgst;
            last.sgst += self.sgst - sum.sgst;
        }
        pieces
    }
}

fn fmt_paise(v: i64) -> String {
    let sign = if v < 0 { "-" } else { "" };
    format!("{sign}{}.{:02}", v.abs() / 100, v.abs() % 100)
}

fn row(gstin: &str, invoice: &str, date: String, m: Money) -> Vec<String> {
    vec![
        gstin.to_string(),
        invoice.to_string(),
        date,
        fmt_paise(m.taxable),
        fmt_paise(m.igst),
        fmt_paise(m.cgst),
        fmt_paise(m.sgst),
    ]
}

/// Generated ledgers, header row first.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    pub cis: Vec<Vec<String>>,
    pub gstr2b: Vec<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

fn random_gstin(rng: &mut StdRng, state: usize) -> String {
    let mut pan = String::with_capacity(10);
    for _ in 0..3 {
        pan.push(ALPHA[rng.gen_range(0..ALPHA.len())] as char);
    }
    pan.push('C');
    pan.push(ALPHA[rng.gen_range(0..ALPHA.len())] as char);
    for _ in 0..4 {
        pan.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    pan.push(ALPHA[rng.gen_range(0..ALPHA.len())] as char);
    let check = char::from(b'0' + rng.gen_range(0..10u8));
    format!("{}{pan}1Z{check}", STATE_CODES[state])
}

fn random_money(rng: &mut StdRng, supplier: &Supplier) -> Money {
    let taxable = rng.gen_range(100_000..=10_000_000i64);
    let rate = TAX_RATES_PCT[rng.gen_range(0..TAX_RATES_PCT.len())];
    let tax = (taxable * rate + 50) / 100;
    if supplier.is_interstate() {
        Money { taxable, igst: tax, cgst: 0, sgst: 0 }
    } else {
        let half = tax / 2;
        Money { taxable, igst: 0, cgst: half, sgst: tax - half }
    }
}

fn random_date(rng: &mut StdRng, from: NaiveDate, to: NaiveDate) -> NaiveDate {
    let span = (to - from).num_days().max(0);
    from + Duration::days(rng.gen_range(0..=span))
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// Generate `records` base invoices plus unmatched and time-barred extras.
pub fn generate(records: usize, seed: u64) -> SampleData {
    let mut rng = StdRng::seed_from_u64(seed);

    let supplier_count = (records / 8).clamp(3, 40);
    let suppliers: Vec<Supplier> = (0..supplier_count)
        .map(|_| {
            let state = rng.gen_range(0..STATE_CODES.len());
            Supplier { gstin: random_gstin(&mut rng, state), state }
        })
        .collect();

    let matched_from = ymd(2024, 4, 1);
    let matched_to = ymd(2025, 1, 31);

    let mut cis = Vec::new();
    let mut gstr2b = Vec::new();

    for i in 0..records {
        let supplier = &suppliers[rng.gen_range(0..suppliers.len())];
        let money = random_money(&mut rng, supplier);
        let date = random_date(&mut rng, matched_from, matched_to);
        let cis_date = date.format("%d-%m-%Y").to_string();
        let g2b_date = date.format("%d/%m/%Y").to_string();
        let serial = 10_000 + 10 * i;
        let invoice = serial.to_string();

        cis.push(row(&supplier.gstin, &invoice, cis_date, money));

        let draw: f64 = rng.gen();
        if draw < 0.55 {
            gstr2b.push(row(&supplier.gstin, &invoice, g2b_date, money));
        } else if draw < 0.60 {
            let parts = rng.gen_range(2..=3);
            for piece in money.split(parts, &mut rng) {
                gstr2b.push(row(&supplier.gstin, &invoice, g2b_date.clone(), piece));
            }
        } else if draw < 0.70 {
            let mut delta = rng.gen_range(1..=3000i64);
            if rng.gen_bool(0.5) {
                delta = -delta;
            }
            let adjusted = Money { taxable: money.taxable + delta, ..money };
            gstr2b.push(row(&supplier.gstin, &invoice, g2b_date, adjusted));
        } else if draw < 0.80 {
            let prefix = NUMERIC_PREFIXES[rng.gen_range(0..NUMERIC_PREFIXES.len())];
            gstr2b.push(row(&supplier.gstin, &format!("{prefix}{invoice}"), g2b_date, money));
        } else if draw < 0.90 {
            // Serial ends in 0; the typo changes only that digit.
            let tag = STATE_TAGS[supplier.state];
            let fuzzy_serial = 50_000 + 10 * i;
            let cis_invoice = format!("{tag}/24/{fuzzy_serial}");
            let typo = format!("{tag}/24/{}", fuzzy_serial + rng.gen_range(1..=9));
            if let Some(last) = cis.last_mut() {
                last[1] = cis_invoice;
            }
            gstr2b.push(row(&supplier.gstin, &typo, g2b_date, money));
        } else {
            gstr2b.push(row(&supplier.sibling_gstin(), &invoice, g2b_date, money));
        }
    }

    // CIS-only invoices: 15% unmatched, plus a few before the cutoff.
    let unmatched = records * 15 / 100;
    for i in 0..unmatched {
        let supplier = &suppliers[rng.gen_range(0..suppliers.len())];
        let money = random_money(&mut rng, supplier);
        let date = random_date(&mut rng, matched_from, matched_to);
        let invoice = (90_000 + i).to_string();
        cis.push(row(&supplier.gstin, &invoice, date.format("%d-%m-%Y").to_string(), money));
    }

    let time_barred = (records * 5 / 100).max(2);
    for i in 0..time_barred {
        let supplier = &suppliers[rng.gen_range(0..suppliers.len())];
        let money = random_money(&mut rng, supplier);
        let date = random_date(&mut rng, ymd(2023, 1, 1), ymd(2024, 3, 30));
        let invoice = (80_000 + i).to_string();
        cis.push(row(&supplier.gstin, &invoice, date.format("%d-%m-%Y").to_string(), money));
    }

    cis.shuffle(&mut rng);
    gstr2b.shuffle(&mut rng);

    let header = |h: &[&str]| h.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    cis.insert(0, header(&CIS_HEADERS));
    gstr2b.insert(0, header(&GSTR2B_HEADERS));

    SampleData { cis, gstr2b }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

fn write_csv(path: &Path, rows: &[Vec<String>]) -> Result<(), CliError> {
    let io_err = |e: csv::Error| CliError::io(format!("cannot write {}: {e}", path.display()));
    let mut w = csv::Writer::from_path(path).map_err(io_err)?;
    for r in rows {
        w.write_record(r).map_err(io_err)?;
    }
    w.flush()
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))
}

/// Write `cis.csv`, `gstr2b.csv` and `recon.toml` into `dir`.
pub fn write_sample(dir: &Path, data: &SampleData) -> Result<Vec<PathBuf>, CliError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", dir.display())))?;

    let cis = dir.join(CIS_FILE);
    let gstr2b = dir.join(GSTR2B_FILE);
    let config = dir.join(CONFIG_FILE);

    write_csv(&cis, &data.cis)?;
    write_csv(&gstr2b, &data.gstr2b)?;
    std::fs::write(&config, SAMPLE_CONFIG)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", config.display())))?;

    Ok(vec![cis, gstr2b, config])
}

pub fn cmd_sample(records: usize, seed: u64, out_dir: PathBuf) -> Result<(), CliError> {
    if records == 0 || records > MAX_RECORDS {
        return Err(CliError {
            code: EXIT_USAGE,
            message: format!("--records must be between 1 and {MAX_RECORDS}, got {records}"),
            hint: None,
        });
    }

    let data = generate(records, seed);
    tracing::info!(
        "generated {} CIS rows and {} GSTR-2B rows (seed {seed})",
        data.cis.len() - 1,
        data.gstr2b.len() - 1
    );

    for path in write_sample(&out_dir, &data)? {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn same_seed_same_data() {
        assert_eq!(generate(40, 7), generate(40, 7));
        assert_ne!(generate(40, 7), generate(40, 8));
    }

    #[test]
    fn row_counts_cover_extras() {
        let data = generate(100, 1);
        // 100 base + 15 unmatched + 5 time-barred, plus header.
        assert_eq!(data.cis.len(), 121);
        assert!(data.gstr2b.len() - 1 >= 100, "splits only add reference rows");
        assert_eq!(data.cis[0], CIS_HEADERS.map(String::from).to_vec());
        assert_eq!(data.gstr2b[0], GSTR2B_HEADERS.map(String::from).to_vec());
    }

    #[test]
    fn gstins_are_fifteen_chars() {
        let data = generate(60, 3);
        for r in data.cis.iter().skip(1).chain(data.gstr2b.iter().skip(1)) {
            assert_eq!(r[0].len(), 15, "{}", r[0]);
        }
    }

    #[test]
    fn sibling_keeps_pan() {
        let s = Supplier { gstin: "27AAACX1234A1Z5".into(), state: 0 };
        let sib = s.sibling_gstin();
        assert_eq!(sib, "27AAACX1234A2Z5");
        assert_eq!(&sib[..10], &s.gstin[..10]);
    }

    #[test]
    fn split_sums_back_exactly() {
        let mut rng = StdRng::seed_from_u64(11);
        let m = Money { taxable: 1_234_567, igst: 0, cgst: 111_111, sgst: 111_112 };
        for parts in 2..=3 {
            let pieces = m.split(parts, &mut rng);
            assert_eq!(pieces.len(), parts);
            assert_eq!(pieces.iter().map(|p| p.taxable).sum::<i64>(), m.taxable);
            assert_eq!(pieces.iter().map(|p| p.cgst).sum::<i64>(), m.cgst);
            assert_eq!(pieces.iter().map(|p| p.sgst).sum::<i64>(), m.sgst);
            assert_eq!(pieces.iter().map(Money::grand_total).sum::<i64>(), m.grand_total());
        }
    }

    #[test]
    fn time_barred_rows_predate_cutoff() {
        let data = generate(50, 5);
        let cutoff = ymd(2024, 3, 31);
        let barred: Vec<NaiveDate> = data
            .cis
            .iter()
            .skip(1)
            .filter(|r| r[1].starts_with('8'))
            .map(|r| NaiveDate::parse_from_str(&r[2], "%d-%m-%Y").unwrap())
            .collect();
        assert_eq!(barred.len(), 2);
        assert!(barred.iter().all(|d| *d < cutoff));
    }

    #[test]
    fn cis_invoices_are_unique() {
        let data = generate(200, 9);
        let invoices: HashSet<&str> = data.cis.iter().skip(1).map(|r| r[1].as_str()).collect();
        assert_eq!(invoices.len(), data.cis.len() - 1);
    }

    #[test]
    fn sample_config_parses() {
        let config = gstrecon::ReconConfig::from_toml(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.source.file, CIS_FILE);
        assert_eq!(config.reference.file, GSTR2B_FILE);
        assert_eq!(config.output.dir.as_deref(), Some("out"));
        assert_eq!(config.reference.columns.supplier_id.names().len(), 3);
        assert_eq!(config.source.columns.supplier_id, "SupplierGSTIN");
    }

    #[test]
    fn rejects_out_of_range_count() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_sample(0, 1, dir.path().to_path_buf()).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
        let err = cmd_sample(MAX_RECORDS + 1, 1, dir.path().to_path_buf()).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
    }
}
