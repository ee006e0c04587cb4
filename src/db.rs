use std::path::Path;
use std::str::FromStr;

use rusqlite::Connection;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{PennyError, Result};
use crate::models::{Category, ImportResult, ImportSource, NewTransaction, Transaction};
use crate::store::RecordStore;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    keywords TEXT NOT NULL DEFAULT '',
    icon TEXT NOT NULL DEFAULT '',
    position INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    date TEXT NOT NULL,
    amount TEXT NOT NULL,
    category TEXT NOT NULL,
    description TEXT NOT NULL,
    user TEXT NOT NULL,
    source TEXT NOT NULL,
    card TEXT NOT NULL DEFAULT '',
    is_shared INTEGER DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_transactions_date_amount ON transactions (date, amount);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    bank TEXT NOT NULL,
    source TEXT NOT NULL,
    checksum TEXT,
    imported INTEGER NOT NULL,
    skipped_duplicates INTEGER NOT NULL,
    errors INTEGER NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);
";

// (name, keywords, icon)
const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("Groceries", "supermarket,grocery,whole foods,trader joe", "\u{1F6D2}"),
    ("Dining", "restaurant,doordash,uber eats,chipotle,starbucks", "\u{1F37D}\u{FE0F}"),
    ("Transport", "gas,uber,lyft,parking,toll", "\u{1F697}"),
    ("Shopping", "amazon,target,walmart,costco", "\u{1F6CD}\u{FE0F}"),
    ("Entertainment", "netflix,spotify,movies,hulu,disney", "\u{1F3AC}"),
    ("Health", "pharmacy,doctor,gym,hospital,dental", "\u{1F3E5}"),
    ("Utilities", "electric,water,internet,phone,gas bill", "\u{1F4A1}"),
    ("Housing", "rent,mortgage,maintenance,hoa", "\u{1F3E0}"),
    ("Subscriptions", "software,apps,memberships,cloud", "\u{1F4F1}"),
    ("Travel", "hotel,airline,airbnb,flight,booking", "\u{2708}\u{FE0F}"),
    ("Education", "courses,books,tuition,udemy", "\u{1F4DA}"),
    ("Personal", "salon,clothing,gifts,haircut", "\u{1F485}"),
    ("Insurance", "auto insurance,health insurance,life insurance", "\u{1F6E1}\u{FE0F}"),
    ("Other", "uncategorized", "\u{1F4E6}"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for (position, (name, keywords, icon)) in DEFAULT_CATEGORIES.iter().enumerate() {
            conn.execute(
                "INSERT INTO categories (name, keywords, icon, position) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![name, keywords, icon, position as i64],
            )?;
        }
        info!("Populated {} default categories", DEFAULT_CATEGORIES.len());
    }
    Ok(())
}

/// Amounts are stored as text rounded to the cent so equality checks are exact.
fn amount_key(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

pub fn load_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT name, keywords, icon FROM categories ORDER BY position, id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .map(|(name, keywords, icon)| Category {
            name,
            keywords: split_keywords(&keywords),
            icon,
        })
        .collect())
}

pub fn add_category(conn: &Connection, name: &str, keywords: &str, icon: &str) -> Result<()> {
    let next: i64 = conn.query_row(
        "SELECT coalesce(max(position), -1) + 1 FROM categories",
        [],
        |r| r.get(0),
    )?;
    conn.execute(
        "INSERT INTO categories (name, keywords, icon, position) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![name, keywords, icon, next],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// SQLite-backed record store
// ---------------------------------------------------------------------------

pub struct SqliteStore<'a> {
    conn: &'a Connection,
    seq: u64,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn, seq: 0 }
    }

    /// Same ISO date, same amount to the cent, and a case-insensitively equal description.
    pub fn check_duplicate(&self, date: &str, amount: Decimal, description: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT 1 FROM transactions WHERE date = ?1 AND amount = ?2 AND lower(description) = lower(?3)",
        )?;
        Ok(stmt.exists(rusqlite::params![date, amount_key(amount), description])?)
    }

    fn generate_id(&mut self, fingerprint: &str) -> String {
        self.seq += 1;
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(fingerprint.as_bytes());
        hasher.update(self.seq.to_be_bytes());
        hasher.update(nanos.to_be_bytes());
        hex::encode(hasher.finalize())[..8].to_string()
    }

    pub fn record_import(
        &self,
        filename: &str,
        checksum: Option<&str>,
        source: ImportSource,
        result: &ImportResult,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO imports (filename, bank, source, checksum, imported, skipped_duplicates, errors) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                filename,
                result.bank,
                source.as_str(),
                checksum,
                result.imported as i64,
                result.skipped_duplicates as i64,
                result.errors as i64,
            ],
        )?;
        Ok(())
    }

    pub fn recent_transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, amount, category, description, user, source, card FROM transactions \
             ORDER BY date DESC, created_at DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, date, amount, category, description, user, source, card)| {
                let amount = Decimal::from_str(&amount)
                    .map_err(|e| PennyError::Other(format!("Corrupt amount {amount:?} on {id}: {e}")))?;
                Ok(Transaction { id, date, amount, category, description, user, source, card })
            })
            .collect()
    }
}

impl RecordStore for SqliteStore<'_> {
    fn add_transaction(&mut self, txn: &NewTransaction) -> Result<String> {
        if txn.amount <= Decimal::ZERO {
            return Err(PennyError::InvalidData("Amount must be positive".into()));
        }

        let date = txn.transaction_date.format("%Y-%m-%d").to_string();
        if self.check_duplicate(&date, txn.amount, &txn.description)? {
            return Err(PennyError::Duplicate(format!(
                "Duplicate transaction: {date} | ${} | {}",
                amount_key(txn.amount),
                txn.description
            )));
        }

        let id = self.generate_id(&format!("{date}|{}|{}", amount_key(txn.amount), txn.description));
        self.conn.execute(
            "INSERT INTO transactions (id, date, amount, category, description, user, source, card) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                id,
                date,
                amount_key(txn.amount),
                txn.category,
                txn.description,
                txn.user,
                txn.source.as_str(),
                txn.card,
            ],
        )?;
        info!("Added transaction {id}: ${} {}", amount_key(txn.amount), txn.category);
        Ok(id)
    }
}
