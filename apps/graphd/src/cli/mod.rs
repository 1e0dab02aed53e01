//! # graphd CLI Module
//!
//! This module implements the CLI interface for graphd.
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server (default)
//! - `import` - Replace the stored graph with a CSV edge file
//! - `status` - Show actor and edge counts
//! - `query` - Run one query against the stored graph

mod commands;

use crate::config::{Config, Overrides};
use clap::{Args, Parser, Subcommand, ValueEnum};
use graphd_core::{BatchPolicy, GraphError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// graphd - social follow-graph daemon
///
/// Keeps the complete "who follows whom" graph in memory, durable on disk,
/// and answers followers/following set queries over HTTP.
#[derive(Parser, Debug)]
#[command(name = "graphd")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the graph database
    #[arg(short = 'D', long, global = true, env = "GRAPH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "GRAPHD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server options; accepted with or without the `serve` subcommand
    #[command(flatten)]
    pub serve: ServeArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options of the `serve` command.
///
/// Global so that a bare `graphd` (which serves) reads them, including
/// `GRAPH_CSV` from the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(short = 'H', long, global = true)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Bulk-load this CSV edge file at startup instead of recovering
    #[arg(long, global = true, env = "GRAPH_CSV")]
    pub graph_csv: Option<PathBuf>,

    /// Batch error policy: continue-on-error or stop-on-first-error
    #[arg(long, global = true)]
    pub batch_policy: Option<BatchPolicy>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server (default)
    Serve,

    /// Replace the stored graph with a CSV edge file
    Import {
        /// Path to the CSV file of source,target rows
        #[arg(short, long)]
        file: PathBuf,

        /// Field delimiter
        #[arg(long)]
        delimiter: Option<char>,

        /// Skip the first row
        #[arg(long)]
        has_headers: bool,
    },

    /// Show graph status
    Status,

    /// Execute a query on the stored graph
    Query {
        /// Query operation
        #[arg(short, long, value_enum)]
        op: QueryOp,

        /// Actor IDs (comma-separated; two for pair queries)
        #[arg(short, long)]
        actors: String,
    },
}

/// Operations accepted by `graphd query`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    Followers,
    Following,
    Moots,
    FollowersNotFollowing,
    DoesFollow,
    AreMoots,
    IntersectFollowers,
    IntersectFollowing,
}

impl Cli {
    /// Resolve the effective configuration for this invocation.
    pub fn resolve_config(&self) -> Result<Config, GraphError> {
        let mut overrides = Overrides {
            data_dir: self.data_dir.clone(),
            host: self.serve.host.clone(),
            port: self.serve.port,
            graph_csv: self.serve.graph_csv.clone(),
            batch_policy: self.serve.batch_policy,
            ..Overrides::default()
        };
        if let Some(Commands::Import {
            delimiter,
            has_headers,
            ..
        }) = &self.command
        {
            overrides.csv_delimiter = *delimiter;
            overrides.csv_has_headers = *has_headers;
        }
        Config::load(self.config.as_deref(), overrides)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), GraphError> {
    let config = cli.resolve_config()?;
    let json_mode = cli.json;

    match cli.command {
        Some(Commands::Serve) | None => cmd_serve(&config).await,
        Some(Commands::Import { file, .. }) => cmd_import(&config, json_mode, &file),
        Some(Commands::Status) => cmd_status(&config, json_mode),
        Some(Commands::Query { op, actors }) => cmd_query(&config, json_mode, op, &actors),
    }
}

// =============================================================================
// TESTS
// =============================================================================
