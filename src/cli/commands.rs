//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// KYVE source connector
#[derive(Parser, Debug)]
#[command(name = "kyve-source")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Inline config JSON
    #[arg(long, global = true)]
    pub config_json: Option<String>,

    /// State file (JSON)
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Inline state JSON
    #[arg(long, global = true)]
    pub state_json: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show connector specification
    Spec,

    /// Validate the configuration and check every pool is reachable
    Check,

    /// List the pool streams of the configuration
    Discover,

    /// Read records from pool streams
    Read {
        /// Streams to sync (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,

        /// Output directory for Parquet files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum records per stream
        #[arg(long)]
        max_records: Option<usize>,

        /// Emit state after each page
        #[arg(long)]
        state_per_page: bool,

        /// Read every stream from its start offset, ignoring stored state
        #[arg(long)]
        full_refresh: bool,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
    /// Parquet files
    Parquet,
}

impl OutputFormat {
    /// Name as accepted on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Parquet => "parquet",
        }
    }
}
