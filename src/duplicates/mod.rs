//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Digest comparison of every file in a directory
//! - First-seen survivor selection
//! - Removal of the later copies

pub mod finder;

pub use finder::{
    DedupReport, Deduplicator, DuplicatePair, DuplicateScan, FinderError, HashFailure,
};
