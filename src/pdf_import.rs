use std::path::Path;
use std::sync::OnceLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::bank::Bank;
use crate::classifier::looks_like_payment;
use crate::error::{PennyError, Result};
use crate::models::{Extraction, NormalizedTransaction};
use crate::normalize::{parse_amount, parse_date};

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

/// Rows of cells, as laid out on the page.
pub type Table = Vec<Vec<String>>;

/// One page of a statement: whatever tables could be recognized plus the raw text.
///
/// `loose_text` holds the lines that did not end up in any table.
#[derive(Debug, Clone, Default)]
pub struct StatementPage {
    pub tables: Vec<Table>,
    pub text: String,
    pub loose_text: String,
}

impl StatementPage {
    /// Build a page from extracted text, recognizing column-aligned blocks as tables.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let (tables, loose_text) = detect_tables(&text);
        Self { tables, text, loose_text }
    }

    /// A page with explicit tables; `loose_text` is everything printed outside them.
    #[cfg(test)]
    pub fn with_tables(tables: Vec<Table>, loose_text: impl Into<String>) -> Self {
        let loose_text = loose_text.into();
        Self { tables, text: loose_text.clone(), loose_text }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatementDocument {
    pub pages: Vec<StatementPage>,
}

impl StatementDocument {
    /// Read a PDF and extract its text page by page.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| PennyError::InvalidData(format!("Could not open PDF file: {e}")))?;
        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| PennyError::InvalidData(format!("Could not open PDF file: {e}")))?;
        Ok(Self::from_pages(pages.into_iter().map(StatementPage::from_text).collect()))
    }

    pub fn from_pages(pages: Vec<StatementPage>) -> Self {
        Self { pages }
    }

    pub fn first_page_text(&self) -> &str {
        self.pages.first().map(|p| p.text.as_str()).unwrap_or("")
    }

    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn cell_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\t+|\s{2,}").expect("cell split regex"))
}

fn split_cells(line: &str) -> Vec<String> {
    cell_split_re()
        .split(line.trim())
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

type LayoutRun<'t> = Vec<(&'t str, Vec<String>)>;

/// A run shorter than two lines is not a table; its lines go back to the loose text.
fn close_run<'t>(run: &mut LayoutRun<'t>, tables: &mut Vec<Table>, loose: &mut Vec<&'t str>) {
    if run.len() >= 2 {
        tables.push(run.drain(..).map(|(_, cells)| cells).collect());
    } else {
        loose.extend(run.drain(..).map(|(line, _)| line));
    }
}

/// A table is a run of at least two consecutive lines that each break into three or
/// more cells on tab or multi-space gaps. Returns the tables plus every line that is
/// not part of one.
fn detect_tables(text: &str) -> (Vec<Table>, String) {
    let mut tables = Vec::new();
    let mut loose: Vec<&str> = Vec::new();
    let mut current: LayoutRun = Vec::new();

    for line in text.lines() {
        let cells = split_cells(line);
        if cells.len() >= 3 {
            current.push((line, cells));
            continue;
        }
        close_run(&mut current, &mut tables, &mut loose);
        loose.push(line);
    }
    close_run(&mut current, &mut tables, &mut loose);
    (tables, loose.join("\n"))
}

// ---------------------------------------------------------------------------
// Row parsing
// ---------------------------------------------------------------------------

const DATE: &str = r"\d{1,2}/\d{1,2}(?:/\d{2,4})?|(?i:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2}";

fn transaction_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            concat!(
                r"^(?P<date>{date})\s+",
                r"(?:(?:{date})\s+)?",
                r"(?P<desc>.+?)\s+",
                r"(?P<neg>-\s*)?\$?(?P<amount>[\d,]+\.\d{{2}})\s*$"
            ),
            date = DATE
        ))
        .expect("transaction line regex")
    })
}

fn month_abbrev(name: &str) -> Option<u32> {
    let month = match name.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Slash dates go through the shared normalizer; `Jul 20` style dates (Capital One
/// layouts) take the statement year.
fn parse_statement_date(raw: &str, statement_year: Option<i32>) -> Option<NaiveDate> {
    if let Some(d) = parse_date(raw, statement_year) {
        return Some(d);
    }
    let mut parts = raw.split_whitespace();
    let month = month_abbrev(parts.next()?)?;
    let day: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let year = statement_year.unwrap_or_else(|| Local::now().year());
    NaiveDate::from_ymd_opt(year, month, day)
}

#[derive(Debug, PartialEq)]
enum RowOutcome {
    Purchase(NormalizedTransaction),
    /// Parsed, but a payment/credit or a non-positive amount.
    Excluded,
    /// Header, subtotal, or other layout noise.
    NotATransaction,
}

/// Classify each cell of a table row by trial parsing: the first date-like cell is the
/// transaction date, the last numeric cell is the amount, the rest is description.
fn try_parse_row(cells: &[String], statement_year: Option<i32>) -> RowOutcome {
    let mut date_val = None;
    let mut amount_val = None;
    let mut desc_parts: Vec<&str> = Vec::new();

    for cell in cells.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        if let Some(d) = parse_date(cell, statement_year) {
            // Later date cells are post dates; they are neither amount nor description.
            date_val.get_or_insert(d);
            continue;
        }
        if let Some(a) = parse_amount(cell) {
            amount_val = Some(a);
            continue;
        }
        desc_parts.push(cell);
    }

    let description = desc_parts.join(" ");
    let (Some(date), Some(amount)) = (date_val, amount_val) else {
        return RowOutcome::NotATransaction;
    };
    if description.is_empty() {
        return RowOutcome::NotATransaction;
    }
    if amount <= Decimal::ZERO || looks_like_payment(&description) {
        return RowOutcome::Excluded;
    }
    RowOutcome::Purchase(NormalizedTransaction { date, amount, description })
}

/// Stage one: structured extraction from recognized tables.
pub fn parse_table_rows(tables: &[Table], min_cells: usize, statement_year: Option<i32>) -> Extraction {
    let mut out = Extraction::default();
    for row in tables.iter().flatten() {
        if row.len() < min_cells {
            continue;
        }
        match try_parse_row(row, statement_year) {
            RowOutcome::Purchase(txn) => out.transactions.push(txn),
            RowOutcome::Excluded => {
                debug!(row = ?row, "skipping non-purchase table row");
                out.excluded += 1;
            }
            RowOutcome::NotATransaction => {}
        }
    }
    out
}

/// Stage two: line-by-line `<date> <description> <amount>` matching on raw text.
pub fn parse_text_lines(text: &str, statement_year: Option<i32>) -> Extraction {
    let mut out = Extraction::default();
    for line in text.lines() {
        let Some(caps) = transaction_line_re().captures(line.trim()) else {
            continue;
        };
        let description = caps["desc"].trim().to_string();
        let Some(date) = parse_statement_date(&caps["date"], statement_year) else {
            warn!(line = line.trim(), "Skipping statement line: unparseable date");
            out.malformed += 1;
            continue;
        };
        let Some(mut amount) = parse_amount(&caps["amount"]) else {
            warn!(line = line.trim(), "Skipping statement line: unparseable amount");
            out.malformed += 1;
            continue;
        };
        if caps.name("neg").is_some() {
            amount = -amount;
        }
        if amount <= Decimal::ZERO || looks_like_payment(&description) {
            debug!(%description, "skipping non-purchase statement line");
            out.excluded += 1;
            continue;
        }
        out.transactions.push(NormalizedTransaction { date, amount, description });
    }
    out
}

// ---------------------------------------------------------------------------
// Per-bank strategies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageStrategy {
    /// Parse recognized tables; fall back to text lines when they yield no purchases.
    TableFirst { min_cells: usize },
    TextOnly,
}

fn strategy(bank: Bank) -> PageStrategy {
    match bank {
        Bank::Chase => PageStrategy::TableFirst { min_cells: 2 },
        Bank::Discover => PageStrategy::TableFirst { min_cells: 3 },
        Bank::Amex | Bank::CapitalOne => PageStrategy::TextOnly,
    }
}

/// Tables first; lines outside the tables still go through the text stage so a
/// purchase printed with different spacing is not lost.
fn extract_page(page: &StatementPage, strategy: PageStrategy, statement_year: Option<i32>) -> Extraction {
    if let PageStrategy::TableFirst { min_cells } = strategy {
        if !page.tables.is_empty() {
            let mut structured = parse_table_rows(&page.tables, min_cells, statement_year);
            if !structured.transactions.is_empty() {
                structured.extend(parse_text_lines(&page.loose_text, statement_year));
                return structured;
            }
        }
    }
    parse_text_lines(&page.text, statement_year)
}

/// Pull purchases out of every page of a statement already matched to `bank`.
pub fn extract(bank: Bank, doc: &StatementDocument, statement_year: Option<i32>) -> Extraction {
    let strategy = strategy(bank);
    let mut out = Extraction::default();
    for (i, page) in doc.pages.iter().enumerate() {
        let page_out = extract_page(page, strategy, statement_year);
        debug!(bank = bank.name(), page = i + 1, found = page_out.transactions.len(), "parsed page");
        out.extend(page_out);
    }
    out
}
