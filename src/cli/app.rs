//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::Level;

use super::book::{self, BookArgs};
use super::output::{Output, OutputFormat};
use crate::storage::{Config, XmlBookStore};

#[derive(Parser)]
#[command(name = "bookstore")]
#[command(author, version, about = "Manage a book collection stored in a single XML document")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./bookstore.toml, then the global config)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the store document if it does not exist
    Init,

    /// List all books
    List,

    /// Show a book by ISBN
    Show {
        /// ISBN
        isbn: String,
    },

    /// Add a book
    ///
    /// Examples:
    ///   bookstore add --isbn 9043127323207 --title "Learning XML" \
    ///       --author "Erik T. Ray" --year 2003 --price 39.95
    ///   bookstore add --json book.json
    Add(BookArgs),

    /// Add many books from a JSON array, skipping duplicates and invalid entries
    Import {
        /// JSON file ("-" for stdin)
        file: PathBuf,
    },

    /// Replace a book (all fields)
    Update {
        /// ISBN of the book to replace
        #[arg(value_name = "ISBN")]
        key: String,

        #[command(flatten)]
        args: BookArgs,
    },

    /// Delete a book
    Delete {
        /// ISBN
        isbn: String,
    },

    /// Render all books as an HTML report
    Report {
        /// Output file
        #[arg(long, short, default_value = "books-report.html")]
        out: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = Output::new(cli.format);

    let config = Config::load(cli.config.as_deref())?;
    if let Some(source) = &config.source {
        tracing::debug!(config = %source.display(), "Loaded configuration");
    }

    let store = XmlBookStore::from_config(&config.store)
        .await
        .context("Failed to open book store")?;
    tracing::debug!(path = %store.path().display(), "Opened store");

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = match cli.command {
        Commands::Init => {
            output.success(&format!(
                "Initialized book store at {}",
                store.path().display()
            ));
            Ok(())
        }
        Commands::List => book::list(&store, &output, &cancel).await,
        Commands::Show { isbn } => book::show(&store, &output, &isbn, &cancel).await,
        Commands::Add(args) => book::add(&store, &output, args, &cancel).await,
        Commands::Import { file } => book::import(&store, &output, &file, &cancel).await,
        Commands::Update { key, args } => {
            book::update(&store, &output, &key, args, &cancel).await
        }
        Commands::Delete { isbn } => book::delete(&store, &output, &isbn, &cancel).await,
        Commands::Report { out } => {
            book::report(&store, &output, &config.report, &out, &cancel).await
        }
    };

    interrupt.abort();
    result
}
