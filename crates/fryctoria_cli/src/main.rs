//! Fryctoria CLI
//!
//! Command-line tools for inspecting and maintaining the persisted state of
//! the Fryctoria offline sync layer.
//!
//! # Commands
//!
//! - `inspect` - Display queue, mapping and shadow store statistics
//! - `jobs` - List pending jobs in replay order
//! - `mappings` - List local to remote id records
//! - `shadow` - Dump shadowed records
//! - `reset` - Discard every pending job, mapping and shadow record

mod commands;

use clap::{Parser, Subcommand};
use commands::StateDir;
use fryctoria_sync::{SyncConfig, DEFAULT_LOCAL_ID_PREFIX, DEFAULT_NAMESPACE};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fryctoria command-line sync state tools.
#[derive(Parser)]
#[command(name = "fryctoria")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the sync state directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Namespace of the persisted collections
    #[arg(global = true, short, long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Prefix of locally minted ids
    #[arg(global = true, long, default_value = DEFAULT_LOCAL_ID_PREFIX)]
    local_id_prefix: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display queue, mapping and shadow store statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List pending jobs in replay order
    Jobs {
        /// Maximum number of jobs to list
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List local to remote id records
    Mappings {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dump shadowed records
    Shadow {
        /// Only this record type
        type_name: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Discard every pending job, id mapping and shadow record
    Reset {
        /// Confirm that unreplayed local writes may be lost
        #[arg(short, long)]
        yes: bool,

        /// Dry run - show what would be removed
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("Fryctoria CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let path = cli.path.ok_or("Sync state path required")?;
    let config = SyncConfig::new(cli.namespace).with_local_id_prefix(cli.local_id_prefix);
    let state = StateDir::open(&path, config).await?;

    match cli.command {
        Commands::Inspect { format } => commands::inspect::run(&state, &format).await?,
        Commands::Jobs { limit, format } => commands::jobs::run(&state, limit, &format)?,
        Commands::Mappings { format } => commands::mappings::run(&state, &format)?,
        Commands::Shadow { type_name, format } => {
            commands::shadow::run(&state, type_name.as_deref(), &format).await?
        }
        Commands::Reset { yes, dry_run } => commands::reset::run(&state, yes, dry_run).await?,
        Commands::Version => {}
    }

    Ok(())
}
