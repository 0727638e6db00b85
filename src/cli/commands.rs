//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Authenticated HTTP client with single-flight token refresh
#[derive(Parser, Debug)]
#[command(name = "tokenflight")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Client configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend origin, overrides the config file
    #[arg(long, global = true)]
    pub origin: Option<String>,

    /// Token file, overrides the config file
    #[arg(short, long, global = true)]
    pub token_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a GET request
    Get {
        /// Path relative to the base URL
        path: String,

        /// Query parameter (key=value), repeatable
        #[arg(short, long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },

    /// Send an action POST
    Post {
        /// Path relative to the base URL
        path: String,

        /// Action name
        #[arg(short, long)]
        action: String,

        /// Action data (JSON)
        #[arg(short, long, default_value = "{}")]
        data: String,
    },

    /// Renew the stored token
    Refresh,

    /// Inspect or set the stored token
    #[command(subcommand)]
    Token(TokenCommand),

    /// Dashboard lists
    #[command(subcommand)]
    Lists(ListsCommand),

    /// Dashboard streaks
    #[command(subcommand)]
    Streaks(StreaksCommand),
}

/// Token subcommands
#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Print whether a token is stored (and when it was written)
    Show {
        /// Print the token value itself
        #[arg(long)]
        reveal: bool,
    },

    /// Store a token obtained elsewhere (e.g. from a login)
    Set {
        /// Token value
        value: String,
    },
}

/// List subcommands
#[derive(Subcommand, Debug)]
pub enum ListsCommand {
    /// Fetch a list object
    Get {
        /// Legacy list title
        #[arg(long, conflicts_with_all = ["parent_page", "date"])]
        title: Option<String>,

        /// Owning page
        #[arg(long, requires = "date")]
        parent_page: Option<String>,

        /// Day (YYYY-MM-DD)
        #[arg(long, requires = "parent_page")]
        date: Option<String>,
    },

    /// Create or replace a list object from a JSON file
    Create {
        /// List object file (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },
}

/// Streak subcommands
#[derive(Subcommand, Debug)]
pub enum StreaksCommand {
    /// Fetch streaks
    Get,
    /// Record today's activity
    Update,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    Ok((key.to_string(), value.to_string()))
}
