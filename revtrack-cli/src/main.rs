//! revtrack: change-log driven rebuild and promotion bookkeeping.
//!
//! # Usage
//!
//! ```text
//! revtrack resolve --log <file> [--commit-id-length N]
//! revtrack seed --log <file> [--commit-id-length N]
//! revtrack deployed --descriptors a/pom.xml,b/pom.xml --services "a b" --tag <tag>
//! revtrack tags <alpha|beta> [--exclude "a|b"]
//! revtrack promote <env:service:tag>
//! revtrack status [--json]
//! ```
//!
//! stdout carries only the payload a pipeline step consumes; logs go to stderr.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    deployed::DeployedArgs, promote::PromoteArgs, resolve::ResolveArgs, seed::SeedArgs,
    status::StatusArgs, tags::TagsArgs,
};
use revtrack_core::{config, Config, SqliteStore};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "revtrack",
    version,
    about = "Track per-service revisions and decide what to rebuild and promote",
    long_about = None,
)]
struct Cli {
    /// Config file (default: ~/.revtrack/config.yaml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database, overriding the config file.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Debug logging, including the parsed revision index.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a change log and print the comma-joined rebuild list.
    Resolve(ResolveArgs),

    /// Parse a change log and record every service as deployed.
    Seed(SeedArgs),

    /// Mark descriptors deployed, record the UAT tag, print commit ids.
    Deployed(DeployedArgs),

    /// Print tags awaiting promotion to an environment.
    Tags(TagsArgs),

    /// Record that a service tag reached an environment.
    Promote(PromoteArgs),

    /// Show stored revision records.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Shared session
// ---------------------------------------------------------------------------

/// Resolved configuration and database path.
#[derive(Debug)]
pub struct Session {
    pub config: Config,
    pub database: PathBuf,
}

impl Session {
    fn resolve(config_path: Option<PathBuf>, db: Option<PathBuf>) -> Result<Self> {
        let home = config::home().context("could not determine home directory")?;
        let config = match &config_path {
            Some(path) => config::load_from(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => config::load_at(&home).context("failed to load config")?,
        };
        let database = db.unwrap_or_else(|| config.database_path(&home));
        Ok(Self { config, database })
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        tracing::debug!("opening store {}", self.database.display());
        SqliteStore::open(&self.database)
            .with_context(|| format!("failed to open store {}", self.database.display()))
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let session = Session::resolve(cli.config, cli.db)?;
    match cli.command {
        Commands::Resolve(args) => args.run(&session),
        Commands::Seed(args) => args.run(&session),
        Commands::Deployed(args) => args.run(&session),
        Commands::Tags(args) => args.run(&session),
        Commands::Promote(args) => args.run(&session),
        Commands::Status(args) => args.run(&session),
    }
}
