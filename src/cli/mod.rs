pub mod categories;
pub mod import;
pub mod init;
pub mod transactions;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "penny",
    version,
    about = "Import credit-card statements (Chase, Amex, Discover, Capital One) into a local ledger."
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for penny data (default: ~/Documents/penny)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import a CSV export or PDF statement; the bank is auto-detected.
    Import {
        /// Path to a .csv or .pdf statement
        file: String,
        /// Card label stored on each transaction (e.g. "Chase Sapphire")
        #[arg(long, default_value = "")]
        card: String,
        /// Which user owns these transactions
        #[arg(long, value_parser = ["user1", "user2"])]
        user: Option<String>,
        /// Database file (default: <data_dir>/penny.db)
        #[arg(long)]
        db: Option<String>,
    },
    /// Manage spending categories and their keywords.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Show the most recent transactions.
    Transactions {
        /// Number of rows to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Database file (default: <data_dir>/penny.db)
        #[arg(long)]
        db: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List categories in match order.
    List {
        #[arg(long)]
        db: Option<String>,
    },
    /// Add a category.
    Add {
        name: String,
        /// Comma-separated keywords matched against descriptions
        #[arg(long)]
        keywords: String,
        #[arg(long, default_value = "")]
        icon: String,
        #[arg(long)]
        db: Option<String>,
    },
}
