use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use crate::bank::{detect_csv_bank, detect_pdf_bank, supported_bank_list, Bank};
use crate::csv_import::{self, StatementTable};
use crate::error::{PennyError, Result};
use crate::models::{Extraction, ImportResult, ImportSource, NewTransaction, NormalizedTransaction};
use crate::normalize::extract_statement_year;
use crate::pdf_import::{self, StatementDocument};
use crate::store::{Categorizer, RecordStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Pick the import source from the file extension.
pub fn source_for(file_path: &Path) -> Result<ImportSource> {
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => Ok(ImportSource::Csv),
        "pdf" => Ok(ImportSource::Statement),
        _ => Err(PennyError::InvalidData(format!(
            "Unsupported file type: {}. Expected a .csv or .pdf statement.",
            file_path.display()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Import a CSV export or a PDF statement, chosen by file extension.
pub fn import_statement(
    file_path: &Path,
    store: &mut impl RecordStore,
    categorizer: &mut impl Categorizer,
    user: &str,
    card: &str,
) -> Result<ImportResult> {
    match source_for(file_path)? {
        ImportSource::Csv => import_csv(file_path, store, categorizer, user, card),
        ImportSource::Statement => import_pdf(file_path, store, categorizer, user, card),
    }
}

pub fn import_csv(
    file_path: &Path,
    store: &mut impl RecordStore,
    categorizer: &mut impl Categorizer,
    user: &str,
    card: &str,
) -> Result<ImportResult> {
    let table = StatementTable::read(file_path)?;
    import_csv_table(&table, store, categorizer, user, card)
}

pub fn import_pdf(
    file_path: &Path,
    store: &mut impl RecordStore,
    categorizer: &mut impl Categorizer,
    user: &str,
    card: &str,
) -> Result<ImportResult> {
    let doc = StatementDocument::open(file_path)?;
    import_document(&doc, store, categorizer, user, card)
}

pub fn import_csv_table(
    table: &StatementTable,
    store: &mut impl RecordStore,
    categorizer: &mut impl Categorizer,
    user: &str,
    card: &str,
) -> Result<ImportResult> {
    if table.is_empty() {
        return Err(PennyError::InvalidData("CSV file is empty.".into()));
    }

    let bank = detect_csv_bank(&table.headers).ok_or_else(|| {
        PennyError::InvalidData(format!(
            "Unrecognized CSV format. Columns found: {}\nSupported banks: {}",
            table.raw_headers.join(", "),
            supported_bank_list()
        ))
    })?;
    info!(bank = bank.name(), rows = table.rows.len(), "Detected {bank} CSV format");

    let extraction = csv_import::extract(bank, table);
    Ok(persist_all(bank, extraction, ImportSource::Csv, store, categorizer, user, card))
}

pub fn import_document(
    doc: &StatementDocument,
    store: &mut impl RecordStore,
    categorizer: &mut impl Categorizer,
    user: &str,
    card: &str,
) -> Result<ImportResult> {
    if doc.pages.is_empty() {
        return Err(PennyError::InvalidData("PDF has no pages.".into()));
    }
    let first_page = doc.first_page_text();
    if first_page.trim().is_empty() {
        return Err(PennyError::InvalidData(
            "PDF has no extractable text (may be image-based).".into(),
        ));
    }

    let bank = detect_pdf_bank(first_page).ok_or_else(|| {
        PennyError::InvalidData(format!(
            "Unrecognized PDF format. Could not identify the bank.\nSupported banks: {}",
            supported_bank_list()
        ))
    })?;

    let statement_year = extract_statement_year(&doc.full_text());
    info!(
        bank = bank.name(),
        pages = doc.pages.len(),
        year = ?statement_year,
        "Detected {bank} PDF statement"
    );

    let extraction = pdf_import::extract(bank, doc, statement_year);
    Ok(persist_all(bank, extraction, ImportSource::Statement, store, categorizer, user, card))
}

// ---------------------------------------------------------------------------
// Persistence loop
// ---------------------------------------------------------------------------

fn persist_one(
    txn: &NormalizedTransaction,
    source: ImportSource,
    store: &mut impl RecordStore,
    categorizer: &mut impl Categorizer,
    user: &str,
    card: &str,
) -> Result<String> {
    let category = categorizer.categorize(&txn.description)?;
    store.add_transaction(&NewTransaction {
        amount: txn.amount,
        category,
        description: txn.description.clone(),
        user: user.to_string(),
        transaction_date: txn.date,
        source,
        card: card.to_string(),
    })
}

/// Every row ends in exactly one of imported, skipped duplicate, or error.
fn persist_all(
    bank: Bank,
    extraction: Extraction,
    source: ImportSource,
    store: &mut impl RecordStore,
    categorizer: &mut impl Categorizer,
    user: &str,
    card: &str,
) -> ImportResult {
    info!(
        bank = bank.name(),
        excluded = extraction.excluded,
        malformed = extraction.malformed,
        "Extracted {} transactions",
        extraction.transactions.len()
    );

    let mut result = ImportResult {
        imported: 0,
        skipped_duplicates: 0,
        errors: 0,
        bank: bank.name().to_string(),
    };

    for txn in &extraction.transactions {
        match persist_one(txn, source, store, categorizer, user, card) {
            Ok(_) => result.imported += 1,
            Err(e) if e.is_duplicate() => {
                debug!("Skipped: {e}");
                result.skipped_duplicates += 1;
            }
            Err(e) => {
                error!(date = %txn.date, description = %txn.description, "Failed to import transaction: {e}");
                result.errors += 1;
            }
        }
    }

    info!(
        bank = %result.bank,
        imported = result.imported,
        skipped_duplicates = result.skipped_duplicates,
        errors = result.errors,
        "Import complete"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::KeywordCategorizer;
    use crate::models::Category;
    use crate::pdf_import::StatementPage;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::HashSet;

    /// Remembers (date, amount, lowercased description) and rejects repeats.
    #[derive(Default)]
    struct MemoryStore {
        rows: Vec<NewTransaction>,
        seen: HashSet<(NaiveDate, Decimal, String)>,
        fail_on: Option<&'static str>,
    }

    impl RecordStore for MemoryStore {
        fn add_transaction(&mut self, txn: &NewTransaction) -> Result<String> {
            if self.fail_on.is_some_and(|d| txn.description.contains(d)) {
                return Err(PennyError::Other("connection reset".into()));
            }
            let key = (txn.transaction_date, txn.amount, txn.description.to_lowercase());
            if !self.seen.insert(key) {
                return Err(PennyError::Duplicate(format!("Duplicate transaction: {}", txn.description)));
            }
            self.rows.push(txn.clone());
            Ok(format!("id{}", self.rows.len()))
        }
    }

    /// Succeeds on the first call and reports a duplicate on every later one.
    #[derive(Default)]
    struct SecondCallDuplicateStore {
        calls: usize,
    }

    impl RecordStore for SecondCallDuplicateStore {
        fn add_transaction(&mut self, _txn: &NewTransaction) -> Result<String> {
            self.calls += 1;
            if self.calls == 1 {
                Ok("first".into())
            } else {
                Err(PennyError::Duplicate("Duplicate transaction".into()))
            }
        }
    }

    struct FailingCategorizer;

    impl Categorizer for FailingCategorizer {
        fn categorize(&mut self, _description: &str) -> Result<String> {
            Err(PennyError::Other("categories unavailable".into()))
        }
    }

    fn categorizer() -> KeywordCategorizer<'static> {
        KeywordCategorizer::from_categories(vec![
            Category { name: "Groceries".into(), keywords: vec!["whole foods".into()], icon: String::new() },
            Category { name: "Dining".into(), keywords: vec!["chipotle".into()], icon: String::new() },
        ])
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    const CHASE_CSV: &str = "\
Transaction Date,Post Date,Description,Category,Type,Amount,Memo
01/15/2025,01/16/2025,WHOLE FOODS,Groceries,Sale,-25.00,
01/16/2025,01/17/2025,CHIPOTLE,Food & Drink,Sale,-12.50,
01/20/2025,01/20/2025,PAYMENT,,Payment,100.00,
";

    #[test]
    fn test_chase_csv_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "chase.csv", CHASE_CSV);
        let mut store = MemoryStore::default();

        let result = import_csv(&path, &mut store, &mut categorizer(), "user1", "Chase Sapphire").unwrap();

        assert_eq!(
            result,
            ImportResult { imported: 2, skipped_duplicates: 0, errors: 0, bank: "Chase".into() }
        );
        assert_eq!(store.rows[0].amount, Decimal::new(2500, 2));
        assert_eq!(store.rows[0].category, "Groceries");
        assert_eq!(store.rows[1].category, "Dining");
        assert!(store.rows.iter().all(|r| r.source == ImportSource::Csv));
        assert!(store.rows.iter().all(|r| r.card == "Chase Sapphire" && r.user == "user1"));
    }

    #[test]
    fn test_duplicate_is_counted_not_an_error() {
        let table = StatementTable::from_reader(CHASE_CSV.as_bytes()).unwrap();
        let mut store = SecondCallDuplicateStore::default();
        let result = import_csv_table(&table, &mut store, &mut categorizer(), "user1", "").unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.skipped_duplicates, 1);
        assert_eq!(result.errors, 0);
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let table = StatementTable::from_reader(CHASE_CSV.as_bytes()).unwrap();
        let mut store = MemoryStore::default();
        import_csv_table(&table, &mut store, &mut categorizer(), "user1", "").unwrap();

        let again = import_csv_table(&table, &mut store, &mut categorizer(), "user1", "").unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.skipped_duplicates, 2);
        assert_eq!(store.rows.len(), 2);
    }

    #[test]
    fn test_store_failure_counts_error_and_continues() {
        let table = StatementTable::from_reader(CHASE_CSV.as_bytes()).unwrap();
        let mut store = MemoryStore { fail_on: Some("WHOLE"), ..Default::default() };
        let result = import_csv_table(&table, &mut store, &mut categorizer(), "user1", "").unwrap();
        assert_eq!(result.errors, 1);
        assert_eq!(result.imported, 1);
        assert_eq!(store.rows[0].description, "CHIPOTLE");
    }

    #[test]
    fn test_categorizer_failure_counts_as_error() {
        let table = StatementTable::from_reader(CHASE_CSV.as_bytes()).unwrap();
        let mut store = MemoryStore::default();
        let result = import_csv_table(&table, &mut store, &mut FailingCategorizer, "user1", "").unwrap();
        assert_eq!(result.errors, 2);
        assert_eq!(result.imported, 0);
    }

    #[test]
    fn test_unrecognized_csv_lists_columns() {
        let table = StatementTable::from_reader("Foo,Bar,Baz\n1,2,3\n".as_bytes()).unwrap();
        let err = import_csv_table(&table, &mut MemoryStore::default(), &mut categorizer(), "user1", "")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Columns found: Foo, Bar, Baz"), "{msg}");
        assert!(msg.ends_with("Supported banks: Chase, Amex, Discover, Capital One"), "{msg}");
    }

    #[test]
    fn test_unrecognized_csv_lists_columns_as_written() {
        let table = StatementTable::from_reader(" Posting Day ,Memo\n01/15/2025,COFFEE\n".as_bytes()).unwrap();
        let err = import_csv_table(&table, &mut MemoryStore::default(), &mut categorizer(), "user1", "")
            .unwrap_err();
        assert!(err.to_string().contains("Columns found:  Posting Day , Memo\n"), "{err}");
    }

    #[test]
    fn test_headers_only_csv_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "empty.csv", "Date,Description,Amount\n");
        let err = import_csv(&path, &mut MemoryStore::default(), &mut categorizer(), "user1", "").unwrap_err();
        assert_eq!(err.to_string(), "CSV file is empty.");
    }

    #[test]
    fn test_image_only_pdf_differs_from_unknown_bank() {
        let blank = StatementDocument::from_pages(vec![StatementPage::from_text("  \n ")]);
        let err = import_document(&blank, &mut MemoryStore::default(), &mut categorizer(), "user1", "")
            .unwrap_err();
        assert_eq!(err.to_string(), "PDF has no extractable text (may be image-based).");

        let unknown = StatementDocument::from_pages(vec![StatementPage::from_text("Acme Credit Union")]);
        let err = import_document(&unknown, &mut MemoryStore::default(), &mut categorizer(), "user1", "")
            .unwrap_err();
        assert!(err.to_string().starts_with("Unrecognized PDF format. Could not identify the bank."));
        assert!(err.to_string().contains("Supported banks: Chase, Amex, Discover, Capital One"));
    }

    #[test]
    fn test_pdf_without_pages() {
        let err = import_document(
            &StatementDocument::default(),
            &mut MemoryStore::default(),
            &mut categorizer(),
            "user1",
            "",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "PDF has no pages.");
    }

    #[test]
    fn test_pdf_statement_end_to_end() {
        let doc = StatementDocument::from_pages(vec![
            StatementPage::from_text("JPMorgan Chase Bank, N.A.\nStatement Date: 01/04/2025\n"),
            StatementPage::from_text(
                "ACCOUNT ACTIVITY\n12/28 WHOLE FOODS MARKET 45.67\n12/30 PAYMENT THANK YOU 300.00\n01/02 CHIPOTLE 12.50\n",
            ),
        ]);
        let mut store = MemoryStore::default();
        let result = import_document(&doc, &mut store, &mut categorizer(), "user2", "Freedom").unwrap();

        assert_eq!(result.bank, "Chase");
        assert_eq!(result.imported, 2);
        assert_eq!(store.rows[0].transaction_date, NaiveDate::from_ymd_opt(2025, 12, 28).unwrap());
        assert_eq!(store.rows[1].transaction_date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert!(store.rows.iter().all(|r| r.source == ImportSource::Statement && r.user == "user2"));
    }

    #[test]
    fn test_source_for_extension() {
        assert_eq!(source_for(Path::new("a/b/Statement.PDF")).unwrap(), ImportSource::Statement);
        assert_eq!(source_for(Path::new("export.csv")).unwrap(), ImportSource::Csv);
        assert!(source_for(Path::new("notes.txt")).is_err());
        assert!(source_for(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_import_statement_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "march.CSV", CHASE_CSV);
        let result =
            import_statement(&path, &mut MemoryStore::default(), &mut categorizer(), "user1", "").unwrap();
        assert_eq!(result.imported, 2);
    }

    #[test]
    fn test_compute_checksum_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.csv", CHASE_CSV);
        let b = write_file(dir.path(), "b.csv", CHASE_CSV);
        let checksum = compute_checksum(&a).unwrap();
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(&b).unwrap());
    }
}
