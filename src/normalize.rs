use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Parse a statement amount such as `1,234.56`, `$45.67`, `-12.00` or `(12.00)`.
///
/// Returns `None` for anything that is not a number; PDF cells are noisy and a bad
/// cell must never abort extraction.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.replace([',', '$', '"'], "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return Decimal::from_str(inner.trim()).ok().map(|d| -d);
    }
    Decimal::from_str(s).ok()
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

fn numeric(part: &str, max_len: usize) -> Option<u32> {
    if part.is_empty() || part.len() > max_len || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Two-digit years pivot the same way `strftime`'s `%y` does: 69-99 are 19xx, 00-68 are 20xx.
fn expand_short_year(yy: u32) -> i32 {
    if yy >= 69 {
        1900 + yy as i32
    } else {
        2000 + yy as i32
    }
}

/// Parse `MM/DD/YYYY`, `MM/DD/YY`, `YYYY-MM-DD`, or a bare `MM/DD`.
///
/// Bare dates take `fallback_year`, or the current year when none is known.
pub fn parse_date(raw: &str, fallback_year: Option<i32>) -> Option<NaiveDate> {
    let raw = raw.trim();

    let dashed: Vec<&str> = raw.split('-').collect();
    if dashed.len() == 3 && dashed[0].len() == 4 {
        let y = numeric(dashed[0], 4)? as i32;
        let m = numeric(dashed[1], 2)?;
        let d = numeric(dashed[2], 2)?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }

    let parts: Vec<&str> = raw.split('/').collect();
    match parts.as_slice() {
        [m, d, y] => {
            let m = numeric(m, 2)?;
            let d = numeric(d, 2)?;
            let year = match y.len() {
                4 => numeric(y, 4)? as i32,
                2 => expand_short_year(numeric(y, 2)?),
                _ => return None,
            };
            NaiveDate::from_ymd_opt(year, m, d)
        }
        [m, d] => {
            let m = numeric(m, 2)?;
            let d = numeric(d, 2)?;
            let year = fallback_year.unwrap_or_else(|| Local::now().year());
            NaiveDate::from_ymd_opt(year, m, d)
        }
        _ => None,
    }
}

fn slash_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,2}/\d{1,2}/(\d{4})").expect("slash year regex"))
}

fn month_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?:January|February|March|April|May|June|July|August|",
            r"September|October|November|December)\s+(\d{4})"
        ))
        .expect("month year regex")
    })
}

/// Find the statement year in a document's full text.
///
/// The first `MM/DD/YYYY` anywhere wins; failing that, the first `<Month> <YYYY>`.
pub fn extract_statement_year(full_text: &str) -> Option<i32> {
    if let Some(caps) = slash_year_re().captures(full_text) {
        return caps[1].parse().ok();
    }
    month_year_re()
        .captures(full_text)
        .and_then(|caps| caps[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_amount("$45.67"), Some(Decimal::new(4567, 2)));
        assert_eq!(parse_amount("  89.99 "), Some(Decimal::new(8999, 2)));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_parse_amount_negatives() {
        assert_eq!(parse_amount("-25.00"), Some(Decimal::new(-2500, 2)));
        assert_eq!(parse_amount("(1,234.56)"), Some(Decimal::new(-123456, 2)));
        assert_eq!(parse_amount("\"-$50.00\""), Some(Decimal::new(-5000, 2)));
    }

    #[test]
    fn test_parse_date_full_year() {
        assert_eq!(parse_date("01/15/2025", None), Some(d(2025, 1, 15)));
        assert_eq!(parse_date(" 12/01/2024 ", Some(1999)), Some(d(2024, 12, 1)));
    }

    #[test]
    fn test_parse_date_short_year() {
        assert_eq!(parse_date("01/15/25", None), Some(d(2025, 1, 15)));
        assert_eq!(parse_date("03/02/99", None), Some(d(1999, 3, 2)));
    }

    #[test]
    fn test_parse_date_bare_month_day() {
        assert_eq!(parse_date("01/15", Some(2025)), Some(d(2025, 1, 15)));
        let today = Local::now().year();
        assert_eq!(parse_date("06/15", None), Some(d(today, 6, 15)));
    }

    #[test]
    fn test_parse_date_iso() {
        assert_eq!(parse_date("2025-01-15", None), Some(d(2025, 1, 15)));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date("not-a-date", None), None);
        assert_eq!(parse_date("13/01/2025", None), None);
        assert_eq!(parse_date("02/30/2025", None), None);
        assert_eq!(parse_date("01/15/202", None), None);
        assert_eq!(parse_date("WHOLE FOODS", Some(2025)), None);
        assert_eq!(parse_date("45.67", Some(2025)), None);
    }

    #[test]
    fn test_extract_year_from_slash_date() {
        let text = "Statement Date: 02/03/2025\nOpening/Closing Date 01/04/25 - 02/03/25";
        assert_eq!(extract_statement_year(text), Some(2025));
    }

    #[test]
    fn test_extract_year_from_month_name() {
        let text = "Your statement for January 2024\n01/15 COFFEE 4.50";
        assert_eq!(extract_statement_year(text), Some(2024));
    }

    #[test]
    fn test_extract_year_prefers_first_slash_date_over_month_name() {
        let text = "December 2023 summary\nPayment due 01/25/2024";
        assert_eq!(extract_statement_year(text), Some(2024));
    }

    #[test]
    fn test_extract_year_none() {
        assert_eq!(extract_statement_year("no dates in here"), None);
    }
}
