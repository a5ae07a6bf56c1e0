//! Digest-based duplicate detection and removal.
//!
//! # Overview
//!
//! [`Deduplicator`] runs a single linear pass over a directory:
//!
//! 1. **List** the regular files, sorted by name ([`Walker`])
//! 2. **Hash** each file with SHA-256 ([`Hasher`]); unreadable files are
//!    logged and skipped
//! 3. **Pair** every file whose digest was already seen with the first file
//!    that had it
//! 4. **Remove** the later file of every pair, never the first one
//!
//! # Example
//!
//! ```no_run
//! use picgrab::duplicates::Deduplicator;
//! use std::path::Path;
//!
//! let report = Deduplicator::with_defaults()
//!     .deduplicate(Path::new("./Saved_Pic"))
//!     .unwrap();
//! println!("Removed {} duplicate(s)", report.removed());
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::actions::{delete_batch, BatchDeleteResult, DeleteConfig};
use crate::scanner::{FileDigest, Hasher, ScanError, Walker};

/// A later file whose content matches an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicatePair {
    /// The file that will be removed.
    pub duplicate: PathBuf,
    /// The first file seen with the same digest; always kept.
    pub original: PathBuf,
    /// Shared content digest, as hex.
    pub digest: String,
}

/// A file that could not be hashed.
#[derive(Debug, Clone, Serialize)]
pub struct HashFailure {
    /// Path of the skipped file.
    pub path: PathBuf,
    /// Rendered error message.
    pub message: String,
}

/// Outcome of the detection phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateScan {
    /// Directory that was scanned.
    pub directory: PathBuf,
    /// Regular files listed.
    pub files_scanned: usize,
    /// Distinct digests seen.
    pub unique_files: usize,
    /// Files skipped because hashing failed.
    pub hash_failures: Vec<HashFailure>,
    /// Duplicate pairs in scan order.
    pub duplicates: Vec<DuplicatePair>,
}

impl DuplicateScan {
    /// Whether any duplicates were found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    /// Paths to remove, in scan order.
    #[must_use]
    pub fn duplicate_paths(&self) -> Vec<PathBuf> {
        self.duplicates.iter().map(|d| d.duplicate.clone()).collect()
    }
}

/// Outcome of a full deduplication pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupReport {
    /// What the scan found.
    pub scan: DuplicateScan,
    /// What the removal did.
    pub deletion: BatchDeleteResult,
}

impl DedupReport {
    /// Whether any duplicates were found.
    #[must_use]
    pub fn duplicates_found(&self) -> bool {
        self.scan.has_duplicates()
    }

    /// Number of duplicate files actually removed.
    #[must_use]
    pub fn removed(&self) -> usize {
        self.deletion.success_count()
    }
}

/// Errors that stop a deduplication pass before it starts.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The directory could not be listed.
    #[error(transparent)]
    ScanError(#[from] ScanError),
}

/// Finds and removes files with identical content in one directory.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    hasher: Hasher,
    delete_config: DeleteConfig,
}

impl Deduplicator {
    /// Create a deduplicator that removes duplicates according to
    /// `delete_config`.
    #[must_use]
    pub fn new(delete_config: DeleteConfig) -> Self {
        Self {
            hasher: Hasher::new(),
            delete_config,
        }
    }

    /// Create a deduplicator with permanent deletion.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Scan `directory` and pair every duplicate with its first-seen
    /// original, without removing anything.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::ScanError`] if the directory does not exist,
    /// is not a directory or cannot be read. Per-file hash failures are
    /// recorded in the result instead.
    pub fn find_duplicates(&self, directory: &Path) -> Result<DuplicateScan, FinderError> {
        let files = Walker::new(directory).files()?;
        Ok(self.pair(directory, files))
    }

    /// Hash `files` in order and pair each repeat digest with its first
    /// occurrence. Files that cannot be hashed are recorded and skipped.
    fn pair(&self, directory: &Path, files: Vec<PathBuf>) -> DuplicateScan {
        let mut scan = DuplicateScan {
            directory: directory.to_path_buf(),
            files_scanned: files.len(),
            ..DuplicateScan::default()
        };
        let mut first_seen: HashMap<FileDigest, PathBuf> = HashMap::with_capacity(files.len());

        for path in files {
            let digest = match self.hasher.digest(&path) {
                Ok(digest) => digest,
                Err(e) => {
                    log::error!("Failed to hash {}: {}", path.display(), e);
                    scan.hash_failures.push(HashFailure {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match first_seen.get(&digest) {
                Some(original) => {
                    log::warn!(
                        "Duplicate file found: {} matches {}",
                        path.display(),
                        original.display()
                    );
                    scan.duplicates.push(DuplicatePair {
                        duplicate: path,
                        original: original.clone(),
                        digest: digest.to_hex(),
                    });
                }
                None => {
                    first_seen.insert(digest, path);
                }
            }
        }

        scan.unique_files = first_seen.len();
        log::debug!(
            "Scanned {} file(s): {} unique, {} duplicate(s), {} unreadable",
            scan.files_scanned,
            scan.unique_files,
            scan.duplicates.len(),
            scan.hash_failures.len()
        );
        scan
    }

    /// Scan `directory` and remove every duplicate, keeping the first-seen
    /// file of each digest.
    ///
    /// Deletion failures are logged and recorded; they do not stop the
    /// remaining removals.
    ///
    /// # Errors
    ///
    /// See [`find_duplicates`](Self::find_duplicates).
    pub fn deduplicate(&self, directory: &Path) -> Result<DedupReport, FinderError> {
        let scan = self.find_duplicates(directory)?;
        let deletion = delete_batch(&scan.duplicate_paths(), &self.delete_config);
        Ok(DedupReport { scan, deletion })
    }
}
