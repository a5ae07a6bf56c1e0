//! Duplicate file removal.
//!
//! # Overview
//!
//! This module removes files reported as duplicates:
//! - Permanent deletion (default)
//! - Move to system trash (recoverable, opt-in)
//! - Batch operations that keep going after individual failures
//!
//! # Example
//!
//! ```no_run
//! use picgrab::actions::delete::{delete_batch, DeleteConfig};
//! use std::path::PathBuf;
//!
//! let paths = vec![PathBuf::from("./Saved_Pic/aB3dE5gH7j.jpg")];
//! let result = delete_batch(&paths, &DeleteConfig::default());
//! println!("{}", result.summary());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// Permanent delete operation failed.
    #[error("permanent delete failed for {path}: {source}")]
    PermanentDeleteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::TrashFailed { path: p, .. }
            | Self::PermanentDeleteFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }

    fn from_metadata(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// Result of a successful deletion operation.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size of the deleted file in bytes.
    pub size: u64,
    /// Whether deletion was permanent (true) or to trash (false).
    pub permanent: bool,
}

/// A deletion that did not happen.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteFailure {
    /// Path that could not be removed.
    pub path: PathBuf,
    /// Rendered error message.
    pub message: String,
}

/// Results of a batch deletion operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchDeleteResult {
    /// Successfully deleted files.
    pub successes: Vec<DeleteResult>,
    /// Failed deletions with their errors.
    pub failures: Vec<DeleteFailure>,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

impl BatchDeleteResult {
    /// Number of successful deletions.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed deletions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if all deletions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let freed = bytesize::ByteSize::b(self.bytes_freed);
        if self.all_succeeded() {
            format!("Deleted {} file(s), freed {}", self.success_count(), freed)
        } else {
            format!(
                "Deleted {} file(s), {} failed, freed {}",
                self.success_count(),
                self.failure_count(),
                freed
            )
        }
    }
}

/// Configuration for deletion operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteConfig {
    /// Remove files permanently instead of moving them to the trash.
    pub permanent: bool,
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self { permanent: true }
    }
}

impl DeleteConfig {
    /// Create config for trash deletion.
    #[must_use]
    pub fn trash() -> Self {
        Self { permanent: false }
    }

    /// Create config for permanent deletion.
    #[must_use]
    pub fn permanent() -> Self {
        Self { permanent: true }
    }
}

/// Move a single file to the system trash.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if its metadata cannot be read
/// - `TrashFailed` if the trash operation fails
pub fn delete_to_trash(path: &Path) -> Result<DeleteResult, DeleteError> {
    let size = fs::metadata(path)
        .map_err(|e| DeleteError::from_metadata(path, e))?
        .len();

    trash::delete(path).map_err(|e| DeleteError::TrashFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    log::debug!("Moved to trash: {} ({} bytes)", path.display(), size);

    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
        permanent: false,
    })
}

/// Permanently delete a single file.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if its metadata cannot be read
/// - `PermanentDeleteFailed` if the remove call fails
pub fn permanent_delete(path: &Path) -> Result<DeleteResult, DeleteError> {
    let size = fs::metadata(path)
        .map_err(|e| DeleteError::from_metadata(path, e))?
        .len();

    fs::remove_file(path).map_err(|e| DeleteError::PermanentDeleteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    log::debug!("Permanently deleted: {} ({} bytes)", path.display(), size);

    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
        permanent: true,
    })
}

/// Delete one file according to `config`.
///
/// # Errors
///
/// See [`permanent_delete`] and [`delete_to_trash`].
pub fn delete_file(path: &Path, config: &DeleteConfig) -> Result<DeleteResult, DeleteError> {
    if config.permanent {
        permanent_delete(path)
    } else {
        delete_to_trash(path)
    }
}

/// Delete every path in order.
///
/// A failure is logged and recorded; the remaining paths are still
/// processed.
pub fn delete_batch(paths: &[PathBuf], config: &DeleteConfig) -> BatchDeleteResult {
    let mut result = BatchDeleteResult::default();

    for path in paths {
        log::info!("Removing duplicate file: {}", path.display());

        match delete_file(path, config) {
            Ok(del) => {
                result.bytes_freed += del.size;
                result.successes.push(del);
            }
            Err(e) => {
                log::error!("Failed to delete {}: {}", path.display(), e);
                result.failures.push(DeleteFailure {
                    path: path.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    if !paths.is_empty() {
        log::info!("{}", result.summary());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config_is_permanent() {
        assert!(DeleteConfig::default().permanent);
        assert!(DeleteConfig::permanent().permanent);
        assert!(!DeleteConfig::trash().permanent);
    }

    #[test]
    fn test_permanent_delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = create_file(&dir, "dup.jpg", b"12345");

        let result = permanent_delete(&path).unwrap();

        assert!(!path.exists());
        assert_eq!(result.size, 5);
        assert!(result.permanent);
    }

    #[test]
    fn test_permanent_delete_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.jpg");

        let err = permanent_delete(&path).unwrap_err();
        assert!(matches!(err, DeleteError::NotFound(_)));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn test_delete_to_trash_not_found() {
        let path = PathBuf::from("/nonexistent/file.jpg");
        let result = delete_to_trash(&path);

        assert!(matches!(result, Err(DeleteError::NotFound(_))));
    }

    #[test]
    fn test_trash_batch_records_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.jpg");

        let result = delete_batch(&[missing.clone()], &DeleteConfig::trash());

        assert_eq!(result.success_count(), 0);
        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.failures[0].path, missing);
        assert_eq!(result.bytes_freed, 0);
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let first = create_file(&dir, "a.jpg", b"aa");
        let missing = dir.path().join("missing.jpg");
        let last = create_file(&dir, "c.jpg", b"cccc");

        let result = delete_batch(
            &[first.clone(), missing.clone(), last.clone()],
            &DeleteConfig::permanent(),
        );

        assert_eq!(result.success_count(), 2);
        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.failures[0].path, missing);
        assert_eq!(result.bytes_freed, 6);
        assert!(!first.exists());
        assert!(!last.exists());
    }

    #[test]
    fn test_batch_empty() {
        let result = delete_batch(&[], &DeleteConfig::default());
        assert!(result.all_succeeded());
        assert_eq!(result.success_count(), 0);
        assert_eq!(result.bytes_freed, 0);
    }

    #[test]
    fn test_summary_mentions_failures() {
        let mut result = BatchDeleteResult::default();
        assert!(result.summary().starts_with("Deleted 0 file(s)"));

        result.failures.push(DeleteFailure {
            path: PathBuf::from("/x.jpg"),
            message: "gone".to_string(),
        });
        assert!(result.summary().contains("1 failed"));
    }
}
