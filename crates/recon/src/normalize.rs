//! Key and amount normalization.
//!
//! Every function here is total: blank or malformed input yields an empty key,
//! a zero amount or `None` for dates. Nothing in this module can fail a run.

use std::ops::AddAssign;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Keys shorter than this are treated as absent.
pub const MIN_KEY_LEN: usize = 2;

/// Length of the PAN embedded at the front of a GSTIN.
pub const ENTITY_PREFIX_LEN: usize = 10;

const CURRENCY_SYMBOLS: [char; 4] = ['₹', '$', '€', '£'];

/// Larger magnitudes (₹10 trillion and up) are treated as garbage so that
/// group sums stay far from `i64` overflow.
const MAX_ABS_MINOR: i64 = 1_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Uppercase, all whitespace removed.
pub fn normalize_supplier_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// First ten characters of the normalized supplier id (the PAN for a GSTIN).
pub fn entity_prefix(raw: &str) -> String {
    normalize_supplier_id(raw).chars().take(ENTITY_PREFIX_LEN).collect()
}

/// Uppercase, punctuation and whitespace removed, leading zeros stripped.
pub fn basic_invoice_key(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_ascii_punctuation() && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();
    cleaned.trim_start_matches('0').to_string()
}

/// Digits only, leading zeros stripped.
pub fn numeric_invoice_key(raw: &str) -> String {
    digits(raw).trim_start_matches('0').to_string()
}

/// Last four digits when there are more than four, else the zero-stripped digits.
pub fn last4_invoice_key(raw: &str) -> String {
    let d = digits(raw);
    if d.len() > 4 {
        d[d.len() - 4..].to_string()
    } else {
        d.trim_start_matches('0').to_string()
    }
}

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

pub fn is_usable_key(key: &str) -> bool {
    key.chars().count() >= MIN_KEY_LEN
}

/// All comparison keys derived from one record's supplier id and invoice number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NormalizedKeys {
    pub supplier_id: String,
    pub entity_prefix: String,
    pub invoice_basic: String,
    pub invoice_numeric: String,
    pub invoice_last4: String,
}

impl NormalizedKeys {
    pub fn derive(supplier_raw: &str, invoice_raw: &str) -> Self {
        let supplier_id = normalize_supplier_id(supplier_raw);
        let entity_prefix = supplier_id.chars().take(ENTITY_PREFIX_LEN).collect();
        Self {
            supplier_id,
            entity_prefix,
            invoice_basic: basic_invoice_key(invoice_raw),
            invoice_numeric: numeric_invoice_key(invoice_raw),
            invoice_last4: last4_invoice_key(invoice_raw),
        }
    }
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Parse a currency-like cell into minor units (paise). Blank or garbage → 0.
pub fn parse_amount(raw: &str) -> i64 {
    try_parse_amount(raw).unwrap_or(0)
}

/// Like [`parse_amount`] but reports garbage as `None` so callers can log it.
/// Blank input is `Some(0)`.
pub fn try_parse_amount(raw: &str) -> Option<i64> {
    let mut s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    for prefix in ["INR", "Rs.", "RS.", "Rs", "RS"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.to_string();
            break;
        }
    }

    if s.is_empty() {
        return Some(0);
    }

    // Accounting notation: (1,234.00) is negative.
    let (negate, body) = match s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s.as_str()),
    };

    let minor = parse_decimal_minor(body).or_else(|| {
        body.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| (v * 100.0).round())
            .filter(|m| m.abs() < MAX_ABS_MINOR as f64)
            .map(|m| m as i64)
    })?;
    if minor.abs() >= MAX_ABS_MINOR {
        return None;
    }

    Some(if negate { -minor } else { minor })
}

/// Exact decimal → minor units, rounding the third fractional digit half up.
fn parse_decimal_minor(s: &str) -> Option<i64> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
    let mut frac = frac_part.bytes().map(|b| i64::from(b - b'0'));
    let tenths = frac.next().unwrap_or(0);
    let hundredths = frac.next().unwrap_or(0);
    let round_up = i64::from(frac.next().is_some_and(|d| d >= 5));

    let minor = whole
        .checked_mul(100)?
        .checked_add(tenths * 10 + hundredths + round_up)?;
    Some(if negative { -minor } else { minor })
}

/// Render minor units as a plain two-decimal figure, e.g. `-12.05`.
pub fn format_minor(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Taxable value, total tax and grand total of a line or group, in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Amounts {
    pub taxable: i64,
    pub tax: i64,
    pub grand_total: i64,
}

impl Amounts {
    pub fn from_components(taxable: i64, igst: i64, cgst: i64, sgst: i64) -> Self {
        let tax = igst + cgst + sgst;
        Self {
            taxable,
            tax,
            grand_total: taxable + tax,
        }
    }
}

impl AddAssign for Amounts {
    fn add_assign(&mut self, rhs: Self) {
        self.taxable += rhs.taxable;
        self.tax += rhs.tax;
        self.grand_total += rhs.grand_total;
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

// Two-digit-year forms go first: `%Y` would happily read "24" as year 24.
const DATE_FORMATS: [&str; 13] = [
    "%d-%m-%y",
    "%d/%m/%y",
    "%d.%m.%y",
    "%d-%b-%y",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d-%B-%Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// Day-first date parse. Unparsable → `None` ("unknown").
pub fn parse_invoice_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(d);
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.date());
    }

    // Trailing time component we don't recognise: retry on the date part.
    let head = s.split([' ', 'T']).next().unwrap_or("");
    if head.len() < s.len() {
        return DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(head, fmt).ok());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_id_uppercased_and_compacted() {
        assert_eq!(normalize_supplier_id(" 27aabcu 9603r1zm "), "27AABCU9603R1ZM");
        assert_eq!(normalize_supplier_id(""), "");
    }

    #[test]
    fn entity_prefix_is_first_ten() {
        assert_eq!(entity_prefix("27AABCU9603R1ZM"), "27AABCU960");
        assert_eq!(entity_prefix("29aab"), "29AAB");
    }

    #[test]
    fn basic_key_strips_punctuation_and_leading_zeros() {
        assert_eq!(basic_invoice_key("inv/00-12 3"), "INV00123");
        assert_eq!(basic_invoice_key("000-451"), "451");
        assert_eq!(basic_invoice_key("--"), "");
    }

    #[test]
    fn numeric_key_digits_only() {
        assert_eq!(numeric_invoice_key("WB/2024/00123"), "202400123");
        assert_eq!(numeric_invoice_key("INV-007"), "7");
        assert_eq!(numeric_invoice_key("ABC"), "");
    }

    #[test]
    fn last4_keeps_zeros_when_long() {
        assert_eq!(last4_invoice_key("MH-2024-0012"), "0012");
        assert_eq!(last4_invoice_key("INV-0042"), "42");
        assert_eq!(last4_invoice_key("X"), "");
    }

    #[test]
    fn short_keys_are_unusable() {
        assert!(!is_usable_key(""));
        assert!(!is_usable_key("7"));
        assert!(is_usable_key("42"));
    }

    #[test]
    fn amounts_parse_to_minor_units() {
        assert_eq!(parse_amount("1,18,000.50"), 11_800_050);
        assert_eq!(parse_amount("₹ 2,500"), 250_000);
        assert_eq!(parse_amount("Rs. 99.999"), 10_000);
        assert_eq!(parse_amount("(150.25)"), -15_025);
        assert_eq!(parse_amount("-0.5"), -50);
        assert_eq!(parse_amount("1.5E+04"), 1_500_000);
        assert_eq!(parse_amount(""), 0);
        assert_eq!(parse_amount("n/a"), 0);
        assert_eq!(try_parse_amount("n/a"), None);
        assert_eq!(try_parse_amount("  "), Some(0));
    }

    #[test]
    fn grand_total_is_taxable_plus_tax() {
        let a = Amounts::from_components(1_000_000, 180_000, 0, 0);
        assert_eq!(a.tax, 180_000);
        assert_eq!(a.grand_total, 1_180_000);

        let mut sum = a;
        sum += Amounts::from_components(500, 0, 45, 45);
        assert_eq!(sum.grand_total, 1_180_590);
    }

    #[test]
    fn format_minor_two_decimals() {
        assert_eq!(format_minor(0), "0.00");
        assert_eq!(format_minor(205), "2.05");
        assert_eq!(format_minor(-1_234_567), "-12345.67");
    }

    #[test]
    fn dates_parse_day_first() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day);
        assert_eq!(parse_invoice_date("05/04/2024"), d(2024, 4, 5));
        assert_eq!(parse_invoice_date("05-04-2024"), d(2024, 4, 5));
        assert_eq!(parse_invoice_date("2024-04-05"), d(2024, 4, 5));
        assert_eq!(parse_invoice_date("5-Apr-2024"), d(2024, 4, 5));
        assert_eq!(parse_invoice_date("05/04/24"), d(2024, 4, 5));
        assert_eq!(parse_invoice_date("2024-04-05 00:00:00"), d(2024, 4, 5));
        assert_eq!(parse_invoice_date("31/02/2024"), None);
        assert_eq!(parse_invoice_date("soon"), None);
        assert_eq!(parse_invoice_date(""), None);
    }
}
