use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Bank profiles, one variant per supported issuer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    Chase,
    Amex,
    Discover,
    CapitalOne,
}

/// How a bank's export tells purchases apart from payments and credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignConvention {
    /// Purchases are exported negative; flip the sign.
    Negated,
    /// Purchases are already positive; payments are negative.
    Positive,
    /// Purchases live in a Debit column, payments in a Credit column.
    SplitDebitCredit,
}

impl Bank {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chase => "Chase",
            Self::Amex => "Amex",
            Self::Discover => "Discover",
            Self::CapitalOne => "Capital One",
        }
    }

    pub fn csv_sign_convention(&self) -> SignConvention {
        match self {
            Self::Chase => SignConvention::Negated,
            Self::Amex | Self::Discover => SignConvention::Positive,
            Self::CapitalOne => SignConvention::SplitDebitCredit,
        }
    }

    /// Column-membership predicate over trimmed, lowercased header names.
    pub fn matches_columns(&self, cols: &BTreeSet<String>) -> bool {
        let has = |c: &str| cols.contains(c);
        match self {
            Self::CapitalOne => {
                has("transaction date") && has("description") && has("debit") && has("credit")
            }
            Self::Chase => {
                has("transaction date") && has("post date") && has("description") && has("amount")
            }
            Self::Discover => has("trans. date") && has("description") && has("amount"),
            Self::Amex => {
                has("date")
                    && has("description")
                    && has("amount")
                    && !has("transaction date")
                    && !has("trans. date")
                    && !has("post date")
                    && !has("debit")
                    && !has("credit")
            }
        }
    }

    /// Text-containment predicate over the lowercased first page of a PDF.
    pub fn matches_text(&self, text_lower: &str) -> bool {
        match self {
            Self::Chase => text_lower.contains("jpmorgan chase") || text_lower.contains("chase.com"),
            Self::Amex => text_lower.contains("american express") || text_lower.contains("amex"),
            Self::Discover => {
                text_lower.contains("discover")
                    && (text_lower.contains("discover.com")
                        || text_lower.contains("discover bank")
                        || text_lower.contains("discover financial")
                        || text_lower.contains("cashback"))
            }
            Self::CapitalOne => text_lower.contains("capital one"),
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub const SUPPORTED_BANKS: &[Bank] = &[Bank::Chase, Bank::Amex, Bank::Discover, Bank::CapitalOne];

/// Tabular detection order. Capital One must precede Chase: both carry "Transaction Date",
/// and a Debit/Credit export also tends to carry a generic Amount column. Amex goes last
/// because its predicate is the loosest and is written as an exclusion of the others.
pub const CSV_DETECTION_ORDER: &[Bank] = &[Bank::CapitalOne, Bank::Chase, Bank::Discover, Bank::Amex];

/// Document detection order; first match wins.
pub const PDF_DETECTION_ORDER: &[Bank] = &[Bank::Chase, Bank::Amex, Bank::Discover, Bank::CapitalOne];

/// Human-readable list used in every unrecognized-format error.
pub fn supported_bank_list() -> String {
    SUPPORTED_BANKS
        .iter()
        .map(|b| b.name())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn normalize_columns<S: AsRef<str>>(columns: &[S]) -> BTreeSet<String> {
    columns
        .iter()
        .map(|c| c.as_ref().trim().to_lowercase())
        .collect()
}

pub fn detect_csv_bank<S: AsRef<str>>(columns: &[S]) -> Option<Bank> {
    let cols = normalize_columns(columns);
    CSV_DETECTION_ORDER
        .iter()
        .find(|b| b.matches_columns(&cols))
        .copied()
}

pub fn detect_pdf_bank(first_page_text: &str) -> Option<Bank> {
    let text_lower = first_page_text.to_lowercase();
    PDF_DETECTION_ORDER
        .iter()
        .find(|b| b.matches_text(&text_lower))
        .copied()
}
