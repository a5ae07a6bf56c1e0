//! Cooperative cancellation.
//!
//! This module provides the [`CancellationToken`] shared between the fetch
//! loop, the key listener and the Ctrl+C handler. The token wraps an
//! `AtomicBool` that only ever transitions from `false` to `true`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use picgrab::signal::{install_handler, CancellationToken};
//!
//! let token = CancellationToken::new();
//! install_handler(&token).expect("Failed to install signal handler");
//!
//! // Hand clones to background tasks; all clones observe the same flag.
//! let listener_token = token.clone();
//! listener_token.request();
//!
//! assert!(token.is_requested());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, monotonic cancellation flag.
///
/// Once [`request`](Self::request) has been called the token stays
/// cancelled for the rest of the run; there is no way to clear it.
///
/// # Thread Safety
///
/// `CancellationToken` is `Send` and `Sync`. Clones share the same flag and
/// all accesses use `SeqCst` ordering.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// Idempotent: calling it again has no further effect.
    pub fn request(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            log::debug!("Cancellation requested");
        }
    }

    /// Check whether cancellation has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

/// Install a Ctrl+C handler that cancels `token`.
///
/// Interrupting the process cancels the fetch loop the same way the cancel
/// key does, so the final deduplication pass still runs. Should be called
/// once, early in startup.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if a handler is already registered
/// for this process or the platform refuses the registration.
pub fn install_handler(token: &CancellationToken) -> Result<(), SignalError> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        token.request();

        let _ = writeln!(std::io::stderr(), "\nInterrupted. Stopping...");
        let _ = std::io::stderr().flush();

        log::info!("Shutdown signal received");
    })?;
    Ok(())
}
