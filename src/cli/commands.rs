//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stateful, incremental raw-data collector for Bitbucket Server
#[derive(Parser, Debug)]
#[command(name = "scm-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Collector configuration file (YAML)
    #[arg(short, long, global = true, env = "SCM_INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect raw data for one or more resources
    Collect {
        /// Resources to collect, in order (comma-separated, empty = all)
        #[arg(long, value_delimiter = ',')]
        resources: Vec<String>,

        /// Access token, overrides the configured credentials
        #[arg(long, env = "SCM_INGEST_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Ignore stored state and collect everything
        #[arg(long)]
        full_sync: bool,
    },

    /// Show the stored state of a resource
    State {
        /// Resource name
        resource: String,
    },

    /// List built-in resources
    Resources,

    /// Register seed inputs for the configured repository
    Seed {
        /// Branch names
        #[arg(long = "branch")]
        branches: Vec<String>,

        /// Commit hashes
        #[arg(long = "commit")]
        commits: Vec<String>,

        /// Pull request ids
        #[arg(long = "pull-request")]
        pull_requests: Vec<i64>,
    },
}
