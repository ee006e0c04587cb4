use comfy_table::{Cell, Table};

use crate::cli::import::open_ledger;
use crate::db::{add_category, load_categories};
use crate::error::{PennyError, Result};

pub fn list(db: Option<&str>) -> Result<()> {
    let conn = open_ledger(db)?;
    let categories = load_categories(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["", "Name", "Keywords"]);
    for cat in categories {
        table.add_row(vec![
            Cell::new(cat.icon),
            Cell::new(cat.name),
            Cell::new(cat.keywords.join(", ")),
        ]);
    }
    println!("Categories (matched top to bottom)\n{table}");
    Ok(())
}

pub fn add(name: &str, keywords: &str, icon: &str, db: Option<&str>) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PennyError::InvalidData("Category name cannot be empty".into()));
    }
    let conn = open_ledger(db)?;
    if load_categories(&conn)?
        .iter()
        .any(|c| c.name.eq_ignore_ascii_case(name))
    {
        return Err(PennyError::InvalidData(format!("Category already exists: {name}")));
    }
    add_category(&conn, name, keywords, icon)?;
    println!("Added category: {name}");
    Ok(())
}
