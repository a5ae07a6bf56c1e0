//! picgrab - Image Endpoint Poller
//!
//! Repeatedly downloads an image from an HTTP endpoint into a directory,
//! stops early on a key press, and removes byte-identical downloads by
//! SHA-256 digest when the loop ends.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod fetch;
pub mod listener;
pub mod logging;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod signal;

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, Commands, DedupeArgs, FetchArgs};
use crate::config::Config;
use crate::duplicates::Deduplicator;
use crate::error::ExitCode;
use crate::fetch::{HttpTransport, Poller};
use crate::listener::{spawn_listener, ListenerHandle, RawModeGuard, TerminalKeySource};
use crate::progress::Progress;
use crate::signal::CancellationToken;

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the save directory
/// cannot be created, or the directory to deduplicate cannot be listed.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref());

    match cli.effective_command() {
        Commands::Fetch(args) => {
            config.merge_fetch_args(&args);
            config.validate().context("Invalid configuration")?;
            run_fetch(&cli, &args, &config)
        }
        Commands::Dedupe(args) => {
            config.merge_dedupe_args(&args);
            config.validate().context("Invalid configuration")?;
            run_dedupe(&cli, &args, &config)
        }
    }
}

fn run_fetch(cli: &Cli, args: &FetchArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let token = CancellationToken::new();
    if let Err(e) = signal::install_handler(&token) {
        log::warn!("{}", e);
    }

    let transport = HttpTransport::new(config.request_timeout())
        .context("Failed to build the HTTP client")?;

    let mut poller = Poller::new(config.poller_config());
    if args.progress {
        poller = poller.with_progress(Arc::new(Progress::new(cli.quiet)));
    }

    // Raw mode ends before the summary is printed.
    let listening = start_listener(config, &token);

    log::info!("Starting image download...");
    let result = poller.run(&transport, &token);

    if let Some((handle, guard)) = listening {
        handle.stop();
        drop(guard);
    }

    let report = result.with_context(|| {
        format!(
            "Failed to prepare save directory {}",
            config.save_directory.display()
        )
    })?;

    log::info!("{}", report::run_summary(&report));
    if cli.json {
        report::write_json(&report, &mut io::stdout().lock())?;
    }
    log::info!("Download task finished.");
    Ok(ExitCode::Success)
}

/// Put the terminal in raw mode and start the cancel-key listener.
///
/// Returns `None` when listening is disabled, stdin is not a terminal, or
/// the terminal cannot be set up. The run continues without the key in
/// those cases.
fn start_listener(
    config: &Config,
    token: &CancellationToken,
) -> Option<(ListenerHandle, RawModeGuard)> {
    if !config.listen_for_keys {
        log::debug!("Cancel key listener disabled");
        return None;
    }
    if !io::stdin().is_terminal() {
        log::debug!("stdin is not a terminal, cancel key unavailable");
        return None;
    }

    let guard = match RawModeGuard::enable() {
        Ok(guard) => guard,
        Err(e) => {
            log::warn!("Cannot read keys from the terminal: {}", e);
            return None;
        }
    };

    match spawn_listener(TerminalKeySource, config.listener_config(), token.clone()) {
        Ok(handle) => Some((handle, guard)),
        Err(e) => {
            log::warn!("Failed to start the key listener: {}", e);
            None
        }
    }
}

fn run_dedupe(cli: &Cli, args: &DedupeArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let directory = &config.save_directory;
    let deduplicator = Deduplicator::new(config.delete_config());

    if args.dry_run {
        let scan = deduplicator
            .find_duplicates(directory)
            .with_context(|| format!("Failed to scan {}", directory.display()))?;
        for pair in &scan.duplicates {
            log::info!(
                "Would remove {} (same as {})",
                pair.duplicate.display(),
                pair.original.display()
            );
        }
        log::info!("{}", report::scan_summary(&scan));
        if cli.json {
            report::write_json(&scan, &mut io::stdout().lock())?;
        }
        return Ok(ExitCode::Success);
    }

    let dedup = deduplicator
        .deduplicate(directory)
        .with_context(|| format!("Failed to deduplicate {}", directory.display()))?;
    log::info!("{}", report::dedup_summary(&dedup));
    if cli.json {
        report::write_json(&dedup, &mut io::stdout().lock())?;
    }
    Ok(ExitCode::Success)
}
