//! Progress reporting using indicatif.
//!
//! [`Progress`] implements [`FetchProgress`] and shows one bar over the
//! download attempts, with a running count of saved and failed attempts.

use std::sync::{Mutex, PoisonError};

use indicatif::{ProgressBar, ProgressStyle};

use crate::fetch::{AttemptOutcome, FetchProgress};

#[derive(Debug, Default)]
struct Counts {
    saved: u32,
    failed: u32,
}

/// Progress reporter for the download loop.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    counts: Mutex<Counts>,
    quiet: bool,
}

impl Progress {
    /// Create a progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bar will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use picgrab::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            counts: Mutex::new(Counts::default()),
            quiet,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} attempts {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn message(counts: &Counts) -> String {
        format!("({} saved, {} failed)", counts.saved, counts.failed)
    }
}

impl FetchProgress for Progress {
    fn on_start(&self, max_attempts: u32) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new(u64::from(max_attempts));
        pb.set_style(Self::style());
        pb.set_message(Self::message(&Counts::default()));
        *self.bar.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
    }

    fn on_attempt(&self, attempt: u32, outcome: &AttemptOutcome) {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            AttemptOutcome::Saved { .. } => counts.saved += 1,
            _ => counts.failed += 1,
        }

        if let Some(pb) = &*self.bar.lock().unwrap_or_else(PoisonError::into_inner) {
            pb.set_position(u64::from(attempt));
            pb.set_message(Self::message(&counts));
        }
    }

    fn on_finish(&self) {
        let bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(pb) = bar {
            let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
            pb.finish_with_message(Self::message(&counts));
        }
    }
}
