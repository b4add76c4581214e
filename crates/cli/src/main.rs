mod commands;
mod error;
mod logging;

use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use exn::ResultExt;
use shelf_catalog::{Database, Repository};
use shelf_config::{Config, DatabaseConfig};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "shelf", version, about = "Query and maintain the book catalogue")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Apply every pending schema migration
    Migrate,
    /// Revert schema migrations newer than VERSION (0 reverts everything)
    Rollback { version: i64 },
    /// Show a book with its authors and weighted rating
    Book { id: i64 },
    /// List rated books, best first
    TopRated {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    logging::init(&config.log.level, cli.verbose);
    let mut stdout = io::stdout().lock();
    let db = open_database(&cli.command, &config.database).await?;
    let repo = Repository::from(&db);

    let result = match cli.command {
        Command::Migrate => db.migrate().await.or_raise(|| ErrorKind::Catalog),
        Command::Rollback { version } => db.rollback(version).await.or_raise(|| ErrorKind::Catalog),
        Command::Book { id } => commands::show_book(&repo, id, &mut stdout).await,
        Command::TopRated { limit } => commands::top_rated(&repo, limit, &mut stdout).await,
    };
    db.close().await;
    result
}

/// Schema commands get the database as it is; every other command gets it
/// fully migrated.
async fn open_database(command: &Command, config: &DatabaseConfig) -> Result<Database> {
    let path = &config.path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Config)?;
    }
    let max_connections = Some(config.max_connections);
    match command {
        Command::Migrate | Command::Rollback { .. } => Database::open(path, max_connections).await,
        _ => Database::connect(path, max_connections).await,
    }
    .or_raise(|| ErrorKind::Catalog)
}
