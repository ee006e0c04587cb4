use std::io::Read;
use std::path::Path;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::bank::{Bank, SignConvention};
use crate::classifier::looks_like_payment;
use crate::error::{PennyError, Result};
use crate::models::{Extraction, NormalizedTransaction};
use crate::normalize::{parse_amount, parse_date};

// ---------------------------------------------------------------------------
// Tabular source
// ---------------------------------------------------------------------------

/// A bank CSV export held in memory: header names plus raw string cells.
///
/// `headers` are trimmed for detection and lookup; `raw_headers` keep the file's spelling
/// for error messages.
#[derive(Debug, Clone)]
pub struct StatementTable {
    pub headers: Vec<String>,
    pub raw_headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl StatementTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let raw_headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let headers = raw_headers.iter().map(|h| h.trim().to_string()).collect();
        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, raw_headers, rows })
    }

    /// Open and read a CSV file, failing with a user-facing message when it is unreadable.
    pub fn read(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| PennyError::InvalidData(format!("Could not read CSV file: {e}")))?;
        Self::from_reader(std::io::BufReader::new(file))
            .map_err(|e| PennyError::InvalidData(format!("Could not read CSV file: {e}")))
    }

    pub fn is_empty(&self) -> bool {
        self.headers.iter().all(|h| h.is_empty()) || self.rows.is_empty()
    }

    /// Index of a column by name, ignoring case and surrounding whitespace.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    fn cell<'a>(&self, row: &'a [String], idx: Option<usize>) -> &'a str {
        idx.and_then(|i| row.get(i)).map(|s| s.trim()).unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Per-bank layouts
// ---------------------------------------------------------------------------

struct CsvLayout {
    date: &'static str,
    amount: &'static str,
    description: &'static str,
}

fn layout(bank: Bank) -> CsvLayout {
    match bank {
        // Transaction Date, Post Date, Description, Category, Type, Amount, Memo
        Bank::Chase => CsvLayout { date: "Transaction Date", amount: "Amount", description: "Description" },
        // Date, Description, Amount [, extended columns]
        Bank::Amex => CsvLayout { date: "Date", amount: "Amount", description: "Description" },
        // Trans. Date, Post Date, Description, Amount, Category
        Bank::Discover => CsvLayout { date: "Trans. Date", amount: "Amount", description: "Description" },
        // Transaction Date, Posted Date, Card No., Description, Category, Debit, Credit
        Bank::CapitalOne => CsvLayout { date: "Transaction Date", amount: "Debit", description: "Description" },
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Resolve a row's raw amount cell into a signed purchase amount.
///
/// `Ok(None)` means the row is intentionally not a purchase; `Err` means the cell is unreadable.
fn purchase_amount(convention: SignConvention, raw: &str) -> std::result::Result<Option<Decimal>, String> {
    if convention == SignConvention::SplitDebitCredit && raw.is_empty() {
        return Ok(None);
    }
    let amount = parse_amount(raw).ok_or_else(|| format!("unparseable amount {raw:?}"))?;
    let amount = match convention {
        SignConvention::Negated => -amount,
        SignConvention::Positive | SignConvention::SplitDebitCredit => amount,
    };
    Ok((amount > Decimal::ZERO).then_some(amount))
}

/// Pull purchases out of a CSV export already matched to `bank`.
pub fn extract(bank: Bank, table: &StatementTable) -> Extraction {
    let layout = layout(bank);
    let convention = bank.csv_sign_convention();
    let idx_date = table.column(layout.date);
    let idx_amount = table.column(layout.amount);
    let idx_desc = table.column(layout.description);

    let mut out = Extraction::default();
    for (i, row) in table.rows.iter().enumerate() {
        let line = i + 2;
        let amount = match purchase_amount(convention, table.cell(row, idx_amount)) {
            Ok(Some(a)) => a,
            Ok(None) => {
                debug!(bank = bank.name(), line, "skipping payment/credit row");
                out.excluded += 1;
                continue;
            }
            Err(reason) => {
                warn!(bank = bank.name(), line, "Skipping {} row: {reason}", bank.name());
                out.malformed += 1;
                continue;
            }
        };

        let raw_date = table.cell(row, idx_date);
        let Some(date) = parse_date(raw_date, None) else {
            warn!(bank = bank.name(), line, "Skipping {} row: unparseable date {raw_date:?}", bank.name());
            out.malformed += 1;
            continue;
        };

        let description = table.cell(row, idx_desc).to_string();
        if looks_like_payment(&description) {
            debug!(bank = bank.name(), line, %description, "skipping payment-like description");
            out.excluded += 1;
            continue;
        }

        out.transactions.push(NormalizedTransaction { date, amount, description });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table(content: &str) -> StatementTable {
        StatementTable::from_reader(content.as_bytes()).unwrap()
    }

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_chase_flips_sign_and_drops_payments() {
        let t = table("\
Transaction Date,Post Date,Description,Category,Type,Amount,Memo
01/15/2025,01/16/2025,WHOLE FOODS MARKET,Groceries,Sale,-45.67,
01/20/2025,01/20/2025,AUTOMATIC PAYMENT - THANK,,Payment,500.00,
");
        let out = extract(Bank::Chase, &t);
        assert_eq!(out.transactions.len(), 1);
        let txn = &out.transactions[0];
        assert_eq!(txn.amount, dec(4567));
        assert_eq!(txn.description, "WHOLE FOODS MARKET");
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(out.excluded, 1);
    }

    #[test]
    fn test_amex_keeps_positive_amounts() {
        let t = table("\
Date,Description,Amount
01/15/2025,WHOLE FOODS MARKET,45.67
01/18/2025,ONLINE PAYMENT - THANK YOU,-200.00
");
        let out = extract(Bank::Amex, &t);
        assert_eq!(out.transactions.len(), 1);
        assert_eq!(out.transactions[0].amount, dec(4567));
    }

    #[test]
    fn test_discover_keeps_positive_amounts() {
        let t = table("\
Trans. Date,Post Date,Description,Amount,Category
01/15/2025,01/16/2025,TRADER JOE'S #123,32.10,Supermarkets
01/22/2025,01/22/2025,INTERNET PAYMENT,-150.00,Payments and Credits
");
        let out = extract(Bank::Discover, &t);
        assert_eq!(out.transactions.len(), 1);
        assert_eq!(out.transactions[0].amount, dec(3210));
        assert_eq!(out.transactions[0].description, "TRADER JOE'S #123");
    }

    #[test]
    fn test_capital_one_uses_debit_column() {
        let t = table("\
Transaction Date,Posted Date,Card No.,Description,Category,Debit,Credit
2025-01-15,2025-01-16,1234,WHOLE FOODS MARKET,Groceries,45.67,
2025-01-20,2025-01-20,1234,CAPITAL ONE ONLINE PYMT,Payment/Credit,,300.00
");
        let out = extract(Bank::CapitalOne, &t);
        assert_eq!(out.transactions.len(), 1);
        assert_eq!(out.transactions[0].amount, dec(4567));
        assert_eq!(out.transactions[0].date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(out.excluded, 1);
    }

    #[test]
    fn test_payment_keyword_excluded_even_when_sign_says_purchase() {
        let t = table("\
Date,Description,Amount
01/15/2025,REFUND ADJUSTMENT,12.00
");
        let out = extract(Bank::Amex, &t);
        assert!(out.transactions.is_empty());
        assert_eq!(out.excluded, 1);
    }

    #[test]
    fn test_malformed_rows_are_skipped_not_fatal() {
        let t = table("\
Transaction Date,Post Date,Description,Category,Type,Amount,Memo
not a date,01/16/2025,BAD DATE,,Sale,-10.00,
01/15/2025,01/16/2025,BAD AMOUNT,,Sale,abc,
01/17/2025,01/18/2025,GOOD ROW,,Sale,\"-1,200.00\",
");
        let out = extract(Bank::Chase, &t);
        assert_eq!(out.transactions.len(), 1);
        assert_eq!(out.transactions[0].amount, dec(120000));
        assert_eq!(out.malformed, 2);
    }

    #[test]
    fn test_headers_are_trimmed_and_blank_lines_dropped() {
        let t = table(" Date , Description , Amount \n\n01/15/2025,COFFEE,4.50\n,,\n");
        assert_eq!(t.headers, vec!["Date", "Description", "Amount"]);
        assert_eq!(t.raw_headers, vec![" Date ", " Description ", " Amount "]);
        assert_eq!(t.rows.len(), 1);
        assert_eq!(extract(Bank::Amex, &t).transactions.len(), 1);
    }

    #[test]
    fn test_headers_only_is_empty() {
        let t = table("Date,Description,Amount\n");
        assert!(t.is_empty());
    }

    #[test]
    fn test_read_missing_file_is_invalid_data() {
        let err = StatementTable::read(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, PennyError::InvalidData(_)));
        assert!(err.to_string().starts_with("Could not read CSV file"));
    }
}
