//! Directory listing using jwalk.
//!
//! # Overview
//!
//! [`Walker`] lists the regular files directly inside one directory. The
//! save directory is flat, so only depth 1 is visited. Results are sorted
//! by file name, which makes the "first seen" file of a duplicate group
//! the same on every platform.
//!
//! Subdirectories, symbolic links and special files are skipped silently.
//! Entries that cannot be read are logged and skipped.
//!
//! # Example
//!
//! ```no_run
//! use picgrab::scanner::Walker;
//! use std::path::Path;
//!
//! let files = Walker::new(Path::new("./Saved_Pic")).files().unwrap();
//! println!("Found {} files", files.len());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use super::ScanError;

/// Single-level directory walker.
#[derive(Debug, Clone)]
pub struct Walker {
    /// Directory to list
    root: PathBuf,
    /// Include names starting with `.`
    include_hidden: bool,
}

impl Walker {
    /// Create a walker for `path`. Hidden files are included.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            root: path.to_path_buf(),
            include_hidden: true,
        }
    }

    /// Skip entries whose names start with `.`.
    #[must_use]
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.include_hidden = !skip;
        self
    }

    /// Collect the regular files of the directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotFound`] if the directory does not exist,
    /// [`ScanError::NotADirectory`] if it is a file, and [`ScanError::Io`]
    /// if its metadata cannot be read.
    pub fn files(&self) -> Result<Vec<PathBuf>, ScanError> {
        self.check_root()?;

        let walk_dir = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .skip_hidden(!self.include_hidden)
            .sort(true);

        let mut files = Vec::new();
        for entry in walk_dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map_or_else(|| self.root.clone(), Path::to_path_buf);
                    log::warn!("Skipping unreadable entry {}: {}", path.display(), e);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if !file_type.is_file() {
                log::trace!("Skipping non-file entry: {}", entry.path().display());
                continue;
            }
            files.push(entry.path());
        }

        log::debug!(
            "Listed {} file(s) in {}",
            files.len(),
            self.root.display()
        );
        Ok(files)
    }

    fn check_root(&self) -> Result<(), ScanError> {
        match fs::metadata(&self.root) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(ScanError::NotADirectory(self.root.clone())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ScanError::NotFound(self.root.clone()))
            }
            Err(e) => Err(ScanError::Io {
                path: self.root.clone(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let files = Walker::new(dir.path()).files().unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_files_sorted_by_name() {
        let dir = TempDir::new().unwrap();
        for name in ["zeta.jpg", "Alpha.jpg", "mid.jpg", "beta.jpg"] {
            fs::write(dir.path().join(name), name).unwrap();
        }

        let files = Walker::new(dir.path()).files().unwrap();
        assert_eq!(
            names(&files),
            vec!["Alpha.jpg", "beta.jpg", "mid.jpg", "zeta.jpg"]
        );
    }

    #[test]
    fn test_subdirectories_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("top.jpg"), b"top").unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("inner.jpg"), b"inner").unwrap();

        let files = Walker::new(dir.path()).files().unwrap();
        assert_eq!(names(&files), vec!["top.jpg"]);
    }

    #[test]
    fn test_hidden_files_included_by_default() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".hidden.jpg"), b"h").unwrap();
        fs::write(dir.path().join("shown.jpg"), b"s").unwrap();

        let all = Walker::new(dir.path()).files().unwrap();
        assert_eq!(all.len(), 2);

        let visible = Walker::new(dir.path()).skip_hidden(true).files().unwrap();
        assert_eq!(names(&visible), vec!["shown.jpg"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("real.jpg");
        fs::write(&target, b"real").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link.jpg")).unwrap();

        let files = Walker::new(dir.path()).files().unwrap();
        assert_eq!(names(&files), vec!["real.jpg"]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let result = Walker::new(&missing).files();
        assert!(matches!(result, Err(ScanError::NotFound(_))));
    }

    #[test]
    fn test_file_as_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.jpg");
        fs::write(&file, b"x").unwrap();

        let result = Walker::new(&file).files();
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }
}
