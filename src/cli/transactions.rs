use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::categorizer::KeywordCategorizer;
use crate::cli::import::open_ledger;
use crate::db::SqliteStore;
use crate::error::Result;
use crate::fmt::money;
use crate::settings::load_settings;

pub fn run(limit: usize, db: Option<&str>) -> Result<()> {
    let conn = open_ledger(db)?;
    let store = SqliteStore::new(&conn);
    let rows = store.recent_transactions(limit)?;
    if rows.is_empty() {
        println!("{}", "No transactions yet. Run `penny import <FILE>` first.".dimmed());
        return Ok(());
    }

    let symbol = load_settings().currency_symbol;
    let mut icons = KeywordCategorizer::from_db(&conn);

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Amount", "Category", "Description", "User", "Card", "Source"]);
    for txn in rows {
        let icon = icons.icon_for(&txn.category)?;
        table.add_row(vec![
            Cell::new(txn.id),
            Cell::new(txn.date),
            Cell::new(money(txn.amount, &symbol)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{icon} {}", txn.category)),
            Cell::new(txn.description),
            Cell::new(txn.user),
            Cell::new(txn.card),
            Cell::new(txn.source),
        ]);
    }
    println!("Recent transactions\n{table}");
    Ok(())
}
