use crate::error::Result;
use crate::models::NewTransaction;

/// Where imported transactions end up.
///
/// Implementations own duplicate detection: a transaction whose date, amount and
/// description already exist must be rejected with `PennyError::Duplicate`, and a
/// non-positive amount with `PennyError::InvalidData`.
pub trait RecordStore {
    /// Persist one transaction and return its generated id.
    fn add_transaction(&mut self, txn: &NewTransaction) -> Result<String>;
}

/// Maps a transaction description to a category label.
pub trait Categorizer {
    fn categorize(&mut self, description: &str) -> Result<String>;
}
