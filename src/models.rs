use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// A purchase pulled out of a statement, before categorization and persistence.
///
/// Extractors only construct this for genuine purchases, so `amount` is always positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTransaction {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
}

/// How a transaction entered the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportSource {
    Csv,
    Statement,
}

impl ImportSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Statement => "statement",
        }
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the record store needs to persist one transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub user: String,
    pub transaction_date: NaiveDate,
    pub source: ImportSource,
    pub card: String,
}

/// A row as stored in the `transactions` table.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub date: String,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub user: String,
    pub source: String,
    pub card: String,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub keywords: Vec<String>,
    pub icon: String,
}

/// Outcome counts of one import call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub errors: usize,
    pub bank: String,
}

/// Extractor output: the purchases found plus how many rows were passed over.
///
/// `excluded` counts rows that parsed fine but are not purchases (payments, credits,
/// non-positive amounts); `malformed` counts rows whose date or amount could not be read.
#[derive(Debug, Default, Clone)]
pub struct Extraction {
    pub transactions: Vec<NormalizedTransaction>,
    pub excluded: usize,
    pub malformed: usize,
}

impl Extraction {
    pub fn extend(&mut self, other: Extraction) {
        self.transactions.extend(other.transactions);
        self.excluded += other.excluded;
        self.malformed += other.malformed;
    }
}
