//! Logging infrastructure for picgrab.
//!
//! This module provides logging using the `log` facade and `env_logger` backend.
//! Log levels are determined by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `--verbose` (debug/trace)
//! 3. Default: info level
//!
//! Every line carries a timestamp and the level. With `-v` or more the
//! module path is added.
//!
//! While the cancel-key listener holds the terminal in raw mode, a bare
//! `\n` no longer returns the cursor to column 0, so lines are terminated
//! with `\r\n` instead (see [`set_raw_terminal`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use picgrab::logging::init_logging;
//!
//! // Initialize with default (info) level
//! init_logging(0, false);
//!
//! log::info!("Starting image download...");
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static RAW_TERMINAL: AtomicBool = AtomicBool::new(false);

/// Tell the formatter whether the terminal is in raw mode.
pub fn set_raw_terminal(raw: bool) {
    RAW_TERMINAL.store(raw, Ordering::SeqCst);
}

/// Line terminator for the current terminal mode.
fn line_ending() -> &'static str {
    if RAW_TERMINAL.load(Ordering::SeqCst) {
        "\r\n"
    } else {
        "\n"
    }
}

/// Initialize the logging subsystem based on CLI verbosity flags.
///
/// This function should be called once at the start of the application,
/// before any logging calls are made. Later calls are ignored.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=normal, 1=debug, 2+=trace)
/// * `quiet` - If true, only show errors (overridden by RUST_LOG)
pub fn init_logging(verbose: u8, quiet: bool) {
    let use_env = env::var("RUST_LOG").is_ok();

    let mut builder = Builder::new();

    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    configure_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        return;
    }

    if use_env {
        log::debug!(
            "Logging initialized from RUST_LOG environment variable: {:?}",
            env::var("RUST_LOG").ok()
        );
    } else {
        log::debug!(
            "Logging initialized at level: {:?}",
            determine_level(verbose, quiet)
        );
    }
}

/// Determine the log level from CLI flags.
///
/// # Arguments
///
/// * `verbose` - Verbosity count (0=info, 1=debug, 2+=trace)
/// * `quiet` - If true, use error level
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Timestamp, padded level, optional module path, message.
fn configure_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let timestamp = buf.timestamp_seconds();
        let level = record.level();
        let level_style = buf.default_level_style(level);

        if verbose >= 1 {
            write!(
                buf,
                "{} {level_style}{:<5}{level_style:#} [{}] {}{}",
                timestamp,
                level,
                record.module_path().unwrap_or("unknown"),
                record.args(),
                line_ending()
            )
        } else {
            write!(
                buf,
                "{} {level_style}{:<5}{level_style:#} {}{}",
                timestamp,
                level,
                record.args(),
                line_ending()
            )
        }
    });
}
