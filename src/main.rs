mod bank;
mod categorizer;
mod classifier;
mod cli;
mod csv_import;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod normalize;
mod pdf_import;
mod settings;
mod store;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{CategoriesCommands, Cli, Commands};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import { file, card, user, db } => {
            cli::import::run(&file, &card, user.as_deref(), db.as_deref())
        }
        Commands::Categories { command } => match command {
            CategoriesCommands::List { db } => cli::categories::list(db.as_deref()),
            CategoriesCommands::Add {
                name,
                keywords,
                icon,
                db,
            } => cli::categories::add(&name, &keywords, &icon, db.as_deref()),
        },
        Commands::Transactions { limit, db } => cli::transactions::run(limit, db.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
