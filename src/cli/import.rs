use std::path::{Path, PathBuf};

use colored::Colorize;
use rusqlite::Connection;
use tracing::warn;

use crate::categorizer::KeywordCategorizer;
use crate::db::{get_connection, init_db, SqliteStore};
use crate::error::{PennyError, Result};
use crate::importer::{compute_checksum, import_statement, source_for};
use crate::models::{ImportResult, ImportSource};
use crate::settings::{db_path, load_settings, shellexpand_path};

/// Open the ledger, creating its directory and schema on first use.
pub(crate) fn open_ledger(db: Option<&str>) -> Result<Connection> {
    let path = db_path(db);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = get_connection(&path)?;
    init_db(&conn)?;
    Ok(conn)
}

/// Write the `imports` audit row. The transactions are already committed, so a failure
/// here is logged and the summary is still printed.
fn record_audit(
    store: &SqliteStore,
    file_path: &Path,
    filename: &str,
    source: ImportSource,
    result: &ImportResult,
) -> bool {
    let checksum = match compute_checksum(file_path) {
        Ok(c) => Some(c),
        Err(e) => {
            warn!("Could not checksum {filename}: {e}");
            None
        }
    };
    match store.record_import(filename, checksum.as_deref(), source, result) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not record import of {filename}: {e}");
            false
        }
    }
}

pub fn run(file: &str, card: &str, user: Option<&str>, db: Option<&str>) -> Result<()> {
    let file_path = PathBuf::from(shellexpand_path(file));
    if !file_path.exists() {
        return Err(PennyError::InvalidData(format!("File not found: {}", file_path.display())));
    }
    let source = source_for(&file_path)?;

    let settings = load_settings();
    let user = user.unwrap_or(settings.default_user.as_str());

    let conn = open_ledger(db)?;
    let mut store = SqliteStore::new(&conn);
    let mut categorizer = KeywordCategorizer::from_db(&conn);

    let filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    println!("Importing: {}", filename.bold());
    if !card.is_empty() {
        println!("Card: {card}");
    }

    let result = import_statement(&file_path, &mut store, &mut categorizer, user, card)?;

    record_audit(&store, &file_path, &filename, source, &result);

    println!();
    println!("Bank detected: {}", result.bank.cyan().bold());
    println!("{} {} transactions", "Imported:".green(), result.imported);
    println!("{} {}", "Skipped (duplicates):".yellow(), result.skipped_duplicates);
    if result.errors > 0 {
        println!("{} {}", "Errors:".red().bold(), result.errors);
    }
    Ok(())
}
