//! SHA-256 file hasher with streaming support.
//!
//! # Overview
//! This module provides the [`Hasher`] struct for computing SHA-256 digests
//! of file contents. Files are read in fixed-size chunks so large downloads
//! never have to fit in memory at once; the digest is identical to hashing
//! the whole content in one go.

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::HashError;

/// Read buffer size for streaming hashes (64 KiB).
pub const BUFFER_SIZE: usize = 64 * 1024;

/// SHA-256 digest of a file's full content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileDigest([u8; 32]);

impl FileDigest {
    /// Digest of an in-memory byte slice.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self::from_sha256(hasher)
    }

    fn from_sha256(hasher: Sha256) -> Self {
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    /// Lowercase hexadecimal representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Stateless SHA-256 file hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default read buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: BUFFER_SIZE,
        }
    }

    /// Override the read buffer size (minimum 1 byte).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Compute the digest of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read, for
    /// example after it was deleted or its permissions changed.
    pub fn digest(&self, path: &Path) -> Result<FileDigest, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..read]);
        }

        let digest = FileDigest::from_sha256(hasher);
        log::trace!("{} {}", digest, path.display());
        Ok(digest)
    }
}
