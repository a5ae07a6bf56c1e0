//! The download-cancel-deduplicate loop.
//!
//! # Overview
//!
//! [`Poller::run`] makes up to `max_attempts` GET requests to one URL:
//!
//! - 2xx: the body is written to a new random file name in the save directory
//! - any other status: logged as a warning, nothing is written
//! - no response (timeout, DNS, refused): logged as an error
//!
//! Between attempts it waits `interval`, checking the [`CancellationToken`]
//! every `poll_slice`. Cancellation is also checked before each attempt. An
//! attempt that is already in flight is allowed to finish.
//!
//! However the loop ends, the save directory is deduplicated exactly once
//! before `run` returns.
//!
//! # Example
//!
//! ```no_run
//! use picgrab::fetch::{HttpTransport, Poller, PollerConfig};
//! use picgrab::signal::CancellationToken;
//! use std::time::Duration;
//!
//! let transport = HttpTransport::new(Duration::from_secs(10)).unwrap();
//! let token = CancellationToken::new();
//! let report = Poller::new(PollerConfig::default())
//!     .run(&transport, &token)
//!     .unwrap();
//! println!("Saved {} file(s)", report.saved.len());
//! ```

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::naming::{create_unique_file, NamingConfig};
use super::transport::Transport;
use super::FetchError;
use crate::actions::DeleteConfig;
use crate::duplicates::{DedupReport, Deduplicator};
use crate::signal::CancellationToken;

/// Endpoint polled when nothing else is configured.
pub const DEFAULT_IMAGE_URL: &str = "https://www.loliapi.com/bg/";

/// Save directory used when nothing else is configured.
pub const DEFAULT_SAVE_DIRECTORY: &str = "./Saved_Pic";

/// Default number of attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 400;

/// Default pause between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Granularity of cancellation checks while waiting.
pub const DEFAULT_POLL_SLICE: Duration = Duration::from_millis(100);

/// Settings for one run of the loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// URL requested on every attempt.
    pub url: String,
    /// Directory receiving the downloads.
    pub directory: PathBuf,
    /// Upper bound on attempts.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub interval: Duration,
    /// Cancellation check granularity during the pause.
    pub poll_slice: Duration,
    /// File name shape.
    pub naming: NamingConfig,
    /// How duplicates are removed at the end.
    pub delete: DeleteConfig,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_IMAGE_URL.to_string(),
            directory: PathBuf::from(DEFAULT_SAVE_DIRECTORY),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            poll_slice: DEFAULT_POLL_SLICE,
            naming: NamingConfig::default(),
            delete: DeleteConfig::default(),
        }
    }
}

impl PollerConfig {
    /// Set the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the save directory.
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Set the number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the pause between attempts.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the cancellation check granularity.
    #[must_use]
    pub fn with_poll_slice(mut self, slice: Duration) -> Self {
        self.poll_slice = slice;
        self
    }

    /// Set the file naming scheme.
    #[must_use]
    pub fn with_naming(mut self, naming: NamingConfig) -> Self {
        self.naming = naming;
        self
    }

    /// Set how duplicates are removed.
    #[must_use]
    pub fn with_delete_config(mut self, delete: DeleteConfig) -> Self {
        self.delete = delete;
        self
    }
}

/// What happened during one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The body was saved.
    Saved { path: PathBuf, bytes: u64 },
    /// The server answered with a non-2xx status.
    HttpStatus(u16),
    /// No response was obtained.
    Network(String),
    /// A response arrived but could not be stored.
    SaveFailed(String),
}

/// Observer for attempt progress, e.g. a progress bar.
pub trait FetchProgress: Send + Sync {
    /// Called once before the first attempt.
    fn on_start(&self, max_attempts: u32);

    /// Called after each attempt.
    fn on_attempt(&self, attempt: u32, outcome: &AttemptOutcome);

    /// Called once the loop has stopped, before deduplication.
    fn on_finish(&self);
}

/// Summary of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// URL that was polled.
    pub url: String,
    /// Save directory.
    pub directory: PathBuf,
    /// Configured attempt limit.
    pub max_attempts: u32,
    /// Attempts actually started.
    pub attempts_made: u32,
    /// Files written, in order.
    pub saved: Vec<PathBuf>,
    /// Total bytes written.
    pub bytes_saved: u64,
    /// Attempts answered with a non-2xx status.
    pub http_failures: u32,
    /// Attempts without a response.
    pub network_failures: u32,
    /// Attempts whose body could not be stored.
    pub save_failures: u32,
    /// Whether the loop stopped because of cancellation.
    pub cancelled: bool,
    /// Wall time of the loop, excluding deduplication.
    pub elapsed_ms: u64,
    /// Result of the final deduplication pass.
    pub dedup: Option<DedupReport>,
    /// Why the final deduplication pass could not run.
    pub dedup_error: Option<String>,
}

impl RunReport {
    /// Number of duplicates removed at the end of the run.
    #[must_use]
    pub fn duplicates_removed(&self) -> usize {
        self.dedup.as_ref().map_or(0, DedupReport::removed)
    }

    fn record(&mut self, outcome: &AttemptOutcome) {
        match outcome {
            AttemptOutcome::Saved { path, bytes } => {
                self.saved.push(path.clone());
                self.bytes_saved += bytes;
            }
            AttemptOutcome::HttpStatus(_) => self.http_failures += 1,
            AttemptOutcome::Network(_) => self.network_failures += 1,
            AttemptOutcome::SaveFailed(_) => self.save_failures += 1,
        }
    }
}

/// Runs the download loop.
pub struct Poller {
    config: PollerConfig,
    progress: Option<Arc<dyn FetchProgress>>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Poller {
    /// Create a poller.
    #[must_use]
    pub fn new(config: PollerConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Report attempt progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn FetchProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run the loop, then deduplicate the save directory once.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::CreateDir`] if the save directory cannot be
    /// created. Every other failure is logged, counted in the report, and
    /// does not stop the loop.
    pub fn run(
        &self,
        transport: &dyn Transport,
        cancel: &CancellationToken,
    ) -> Result<RunReport, FetchError> {
        let directory = &self.config.directory;
        fs::create_dir_all(directory).map_err(|e| FetchError::CreateDir {
            path: directory.clone(),
            source: e,
        })?;

        let mut report = RunReport {
            url: self.config.url.clone(),
            directory: directory.clone(),
            max_attempts: self.config.max_attempts,
            ..RunReport::default()
        };

        if let Some(progress) = &self.progress {
            progress.on_start(self.config.max_attempts);
        }

        let started = Instant::now();
        let mut rng = rand::rng();

        for attempt in 1..=self.config.max_attempts {
            if cancel.is_requested() {
                log::info!("Download cancelled by user");
                break;
            }

            report.attempts_made = attempt;
            let outcome = self.attempt(attempt, transport, &mut rng);
            report.record(&outcome);
            if let Some(progress) = &self.progress {
                progress.on_attempt(attempt, &outcome);
            }

            if attempt < self.config.max_attempts {
                self.wait(cancel);
            }
        }
        report.cancelled = cancel.is_requested();

        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        if let Some(progress) = &self.progress {
            progress.on_finish();
        }

        self.finish(&mut report);
        Ok(report)
    }

    /// One request and, on success, one write.
    fn attempt<R: rand::Rng>(
        &self,
        attempt: u32,
        transport: &dyn Transport,
        rng: &mut R,
    ) -> AttemptOutcome {
        let response = match transport.get(&self.config.url) {
            Ok(response) => response,
            Err(e) => {
                log::error!("Attempt {} failed, network error: {}", attempt, e);
                return AttemptOutcome::Network(e.to_string());
            }
        };

        if !response.is_success() {
            log::warn!(
                "Attempt {} failed, status code: {}",
                attempt,
                response.status
            );
            return AttemptOutcome::HttpStatus(response.status);
        }

        match self.save(rng, &response.body) {
            Ok(path) => {
                log::info!(
                    "Attempt {} succeeded, image saved as {}",
                    attempt,
                    path.display()
                );
                AttemptOutcome::Saved {
                    path,
                    bytes: response.body.len() as u64,
                }
            }
            Err(e) => {
                log::error!("Attempt {} failed, could not save image: {}", attempt, e);
                AttemptOutcome::SaveFailed(e.to_string())
            }
        }
    }

    fn save<R: rand::Rng>(&self, rng: &mut R, body: &[u8]) -> Result<PathBuf, FetchError> {
        let (path, mut file) =
            create_unique_file(rng, &self.config.directory, &self.config.naming)?;
        if let Err(e) = file.write_all(body).and_then(|()| file.flush()) {
            drop(file);
            if let Err(rm) = fs::remove_file(&path) {
                log::warn!("Could not remove partial file {}: {}", path.display(), rm);
            }
            return Err(FetchError::Write { path, source: e });
        }
        Ok(path)
    }

    /// Sleep for `interval`, returning early once cancellation is observed.
    fn wait(&self, cancel: &CancellationToken) {
        let slice = self.config.poll_slice.max(Duration::from_millis(1));
        let deadline = Instant::now() + self.config.interval;

        loop {
            if cancel.is_requested() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep(slice.min(deadline - now));
        }
    }

    /// Final deduplication pass.
    fn finish(&self, report: &mut RunReport) {
        log::info!(
            "Checking {} for duplicate files...",
            self.config.directory.display()
        );

        match Deduplicator::new(self.config.delete).deduplicate(&self.config.directory) {
            Ok(dedup) => {
                if dedup.duplicates_found() {
                    log::info!(
                        "Found {} duplicate file(s), removed {}",
                        dedup.scan.duplicates.len(),
                        dedup.removed()
                    );
                } else {
                    log::info!("No duplicate files found");
                }
                report.dedup = Some(dedup);
            }
            Err(e) => {
                log::error!("Duplicate check failed: {}", e);
                report.dedup_error = Some(e.to_string());
            }
        }
    }
}
