//! Download loop module.
//!
//! This module provides functionality for:
//! - Polling an image endpoint a bounded number of times
//! - Saving each successful response under a fresh random name
//! - Cooperative cancellation between and during attempts
//! - A final deduplication pass over the save directory
//!
//! # Architecture
//!
//! - [`transport`]: the HTTP seam ([`Transport`]) and its `reqwest` implementation
//! - [`naming`]: random, collision-checked file names
//! - [`poller`]: the loop itself ([`Poller`])

pub mod naming;
pub mod poller;
pub mod transport;

use std::path::PathBuf;

pub use naming::{create_unique_file, random_file_name, NamingConfig};
pub use poller::{AttemptOutcome, FetchProgress, Poller, PollerConfig, RunReport};
pub use transport::{HttpResponse, HttpTransport, Transport, TransportError};

/// Errors raised by the download loop.
///
/// Only [`FetchError::CreateDir`] ends a run; the others are reported per
/// attempt and the loop moves on.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// The save directory could not be created.
    #[error("failed to create save directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A downloaded body could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Every drawn file name already existed.
    #[error("no free file name in {directory} after {attempts} tries")]
    NameSpaceExhausted {
        /// Directory that was searched
        directory: PathBuf,
        /// Number of names drawn
        attempts: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::NameSpaceExhausted {
            directory: PathBuf::from("/pics"),
            attempts: 64,
        };
        assert_eq!(err.to_string(), "no free file name in /pics after 64 tries");

        let err = FetchError::Write {
            path: PathBuf::from("/pics/a.jpg"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(err.to_string(), "failed to write /pics/a.jpg: disk full");
    }
}
