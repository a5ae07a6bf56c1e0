//! Command-line interface definitions for picgrab.
//!
//! Every option only overrides a default: running `picgrab` with no
//! arguments polls `https://www.loliapi.com/bg/` 400 times, saves into
//! `./Saved_Pic` and deduplicates the result.
//!
//! # Example
//!
//! ```bash
//! # Default run (press 1 to stop early)
//! picgrab
//!
//! # Fewer, faster attempts into another directory
//! picgrab fetch --attempts 20 --interval-ms 250 --dir ./pics
//!
//! # Only remove duplicates, report as JSON
//! picgrab --json dedupe ./pics
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Polls an image endpoint, saves every response and removes duplicate downloads.
#[derive(Debug, Parser)]
#[command(name = "picgrab")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(long, global = true, value_name = "PATH", env = "PICGRAB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the final report as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute (defaults to `fetch`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The subcommand to run, defaulting to a plain `fetch`.
    #[must_use]
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Fetch(FetchArgs::default()))
    }
}

/// Available subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Download images repeatedly, then remove duplicates
    Fetch(FetchArgs),
    /// Remove duplicate files from a directory
    Dedupe(DedupeArgs),
}

/// Arguments for the fetch subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct FetchArgs {
    /// Image endpoint to poll
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Directory receiving the downloads
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Number of download attempts
    #[arg(short = 'n', long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub attempts: Option<u32>,

    /// Pause between attempts in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Key that stops the download loop
    #[arg(long, value_name = "KEY")]
    pub cancel_key: Option<char>,

    /// Do not listen for the cancel key
    #[arg(long)]
    pub no_listen: bool,

    /// Show a progress bar over the attempts
    #[arg(long)]
    pub progress: bool,

    /// Move duplicates to the system trash instead of deleting them
    #[arg(long)]
    pub trash: bool,
}

/// Arguments for the dedupe subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct DedupeArgs {
    /// Directory to deduplicate (defaults to the configured save directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Report duplicates without removing them
    #[arg(long)]
    pub dry_run: bool,

    /// Move duplicates to the system trash instead of deleting them
    #[arg(long)]
    pub trash: bool,
}
