//! Human and JSON summaries of finished runs.
//!
//! The human summaries are single lines meant for the log. The JSON form
//! is the serialized report itself, written to any [`Write`] sink.
//!
//! # Example
//!
//! ```
//! use picgrab::fetch::RunReport;
//! use picgrab::report::{run_summary, write_json};
//!
//! let report = RunReport::default();
//! assert!(run_summary(&report).starts_with("0 of 0 attempt(s) made"));
//!
//! let mut out = Vec::new();
//! write_json(&report, &mut out).unwrap();
//! assert!(out.ends_with(b"\n"));
//! ```

use std::io::Write;

use bytesize::ByteSize;
use serde::Serialize;

use crate::duplicates::{DedupReport, DuplicateScan};
use crate::fetch::RunReport;

/// Errors that can occur while writing a JSON report.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error while writing report: {0}")]
    Io(#[from] std::io::Error),
}

/// One-line summary of a download run.
#[must_use]
pub fn run_summary(report: &RunReport) -> String {
    let failed = report.http_failures + report.network_failures + report.save_failures;
    let mut line = format!(
        "{} of {} attempt(s) made, {} saved ({}), {} failed",
        report.attempts_made,
        report.max_attempts,
        report.saved.len(),
        ByteSize::b(report.bytes_saved),
        failed
    );

    if report.cancelled {
        line.push_str(", stopped early");
    }

    match (&report.dedup, &report.dedup_error) {
        (Some(dedup), _) => {
            line.push_str("; ");
            line.push_str(&dedup_summary(dedup));
        }
        (None, Some(err)) => {
            line.push_str("; duplicate check failed: ");
            line.push_str(err);
        }
        (None, None) => {}
    }
    line
}

/// One-line summary of a deduplication pass.
#[must_use]
pub fn dedup_summary(report: &DedupReport) -> String {
    let scan = &report.scan;
    let mut line = format!(
        "{} file(s) checked, {} duplicate(s) removed, {} freed",
        scan.files_scanned,
        report.removed(),
        ByteSize::b(report.deletion.bytes_freed)
    );
    let failed = report.deletion.failure_count();
    if failed > 0 {
        line.push_str(&format!(", {failed} could not be removed"));
    }
    if !scan.hash_failures.is_empty() {
        line.push_str(&format!(", {} unreadable", scan.hash_failures.len()));
    }
    line
}

/// One-line summary of a scan that removed nothing.
#[must_use]
pub fn scan_summary(scan: &DuplicateScan) -> String {
    format!(
        "{} file(s) checked, {} unique, {} duplicate(s) would be removed",
        scan.files_scanned,
        scan.unique_files,
        scan.duplicates.len()
    )
}

/// Write `value` as pretty JSON followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<T, W>(value: &T, writer: &mut W) -> Result<(), ReportError>
where
    T: Serialize + ?Sized,
    W: Write,
{
    let json = serde_json::to_string_pretty(value)?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}
