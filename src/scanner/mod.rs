//! Scanner module for directory listing and file hashing.
//!
//! This module provides functionality for:
//! - Listing the regular files of a single directory
//! - Content hashing with SHA-256
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory listing in a stable (name-sorted) order
//! - [`hasher`]: SHA-256 file hashing (streaming)
//!
//! # Example
//!
//! ```no_run
//! use picgrab::scanner::{Hasher, Walker};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! for path in Walker::new(Path::new("./Saved_Pic")).files().unwrap() {
//!     match hasher.digest(&path) {
//!         Ok(digest) => println!("{}  {}", digest, path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::path::PathBuf;

// Re-export main types
pub use hasher::{FileDigest, Hasher};
pub use walker::Walker;

/// Errors that can occur while listing a directory.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing the directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while hashing `path`.
    pub(crate) fn from_io(path: &std::path::Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}
