//! Random file names for saved downloads.
//!
//! Names are `length` characters drawn uniformly from `[A-Za-z0-9]` plus a
//! fixed extension, e.g. `q3ZyA0bLw9.jpg`. A name that already exists in the
//! target directory is redrawn, up to a fixed number of tries.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use rand::distr::Alphanumeric;
use rand::Rng;

use super::FetchError;

/// Shape of generated file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConfig {
    /// Number of random characters before the extension.
    pub length: usize,
    /// Extension without the leading dot.
    pub extension: String,
    /// How many names to draw before giving up.
    pub max_attempts: u32,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            length: 10,
            extension: "jpg".to_string(),
            max_attempts: 64,
        }
    }
}

/// Draw one candidate file name (no collision check).
pub fn random_file_name<R: Rng>(rng: &mut R, naming: &NamingConfig) -> String {
    let stem: String = (0..naming.length)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();
    if naming.extension.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, naming.extension)
    }
}

/// Create a new, empty file in `dir` under a freshly drawn name.
///
/// The file is opened with `create_new`, so any existing entry, including a
/// dangling symlink, counts as a collision and nothing outside `dir` is
/// ever opened.
///
/// # Errors
///
/// Returns [`FetchError::NameSpaceExhausted`] after `naming.max_attempts`
/// consecutive collisions, or [`FetchError::Write`] if the file cannot be
/// created for any other reason.
pub fn create_unique_file<R: Rng>(
    rng: &mut R,
    dir: &Path,
    naming: &NamingConfig,
) -> Result<(PathBuf, File), FetchError> {
    for attempt in 1..=naming.max_attempts {
        let candidate = dir.join(random_file_name(rng, naming));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                log::debug!(
                    "File name collision on try {}: {}",
                    attempt,
                    candidate.display()
                );
            }
            Err(e) => {
                return Err(FetchError::Write {
                    path: candidate,
                    source: e,
                })
            }
        }
    }

    Err(FetchError::NameSpaceExhausted {
        directory: dir.to_path_buf(),
        attempts: naming.max_attempts,
    })
}

/// Whether `name` has the shape produced by [`random_file_name`].
#[must_use]
pub fn is_generated_name(name: &str, naming: &NamingConfig) -> bool {
    let stem = if naming.extension.is_empty() {
        name
    } else {
        match name
            .strip_suffix(naming.extension.as_str())
            .and_then(|s| s.strip_suffix('.'))
        {
            Some(stem) => stem,
            None => return false,
        }
    };
    stem.len() == naming.length && stem.bytes().all(|b| b.is_ascii_alphanumeric())
}
