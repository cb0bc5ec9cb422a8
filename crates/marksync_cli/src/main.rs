//! marksync CLI
//!
//! Command-line tools for running and inspecting bookmark sync passes.
//!
//! # Commands
//!
//! - `plan` - Show what a pass against a remote snapshot would do
//! - `sync` - Run a pass against a remote snapshot and persist the result
//! - `inspect` - Display stored account state

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// marksync command-line tools.
#[derive(Parser)]
#[command(name = "marksync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the state store directory
    #[arg(global = true, short, long)]
    store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what a pass against a remote snapshot would do
    Plan {
        /// Account to plan for
        #[arg(short, long)]
        account: String,

        /// JSON file holding the remote snapshot
        #[arg(short, long)]
        remote: PathBuf,

        /// Days after which an unchanged entry is re-fetched
        #[arg(long)]
        max_age_days: Option<u64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run a pass against a remote snapshot and persist the result
    Sync {
        /// Account to sync
        #[arg(short, long)]
        account: String,

        /// JSON file holding the remote snapshot
        #[arg(short, long)]
        remote: PathBuf,

        /// Maximum keys per record fetch (1-20)
        #[arg(short, long, default_value_t = marksync_engine::MAX_BATCH_SIZE)]
        batch_size: usize,

        /// Minimum milliseconds between remote calls
        #[arg(short, long, default_value = "0")]
        interval_ms: u64,

        /// Days after which an unchanged entry is re-fetched
        #[arg(long)]
        max_age_days: Option<u64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Display stored account state
    Inspect {
        /// Account to show; lists accounts if omitted
        #[arg(short, long)]
        account: Option<String>,

        /// Show every manifest entry
        #[arg(short, long)]
        entries: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Plan {
            account,
            remote,
            max_age_days,
            format,
        } => {
            let store = cli.store.ok_or("Store path required for plan")?;
            let options = commands::PassOptions {
                max_age_days,
                ..commands::PassOptions::default()
            };
            commands::plan::run(&store, &account, &remote, &options, &format)?;
        }
        Commands::Sync {
            account,
            remote,
            batch_size,
            interval_ms,
            max_age_days,
            format,
        } => {
            let store = cli.store.ok_or("Store path required for sync")?;
            let options = commands::PassOptions {
                batch_size,
                interval_ms,
                max_age_days,
            };
            commands::sync::run(&store, &account, &remote, &options, &format)?;
        }
        Commands::Inspect {
            account,
            entries,
            format,
        } => {
            let store = cli.store.ok_or("Store path required for inspect")?;
            commands::inspect::run(&store, account.as_deref(), entries, &format)?;
        }
        Commands::Version => {
            println!("marksync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("max batch size {}", marksync_engine::MAX_BATCH_SIZE);
        }
    }

    Ok(())
}
