//! Background cancel-key listener.
//!
//! # Overview
//!
//! The listener runs on a detached thread, reads key events from a
//! [`KeyEventSource`] and requests cancellation when the cancel key (`1` by
//! default) is pressed. Ctrl+C also cancels, because raw mode stops the
//! terminal from turning it into SIGINT. Every other key is ignored.
//!
//! The thread is never joined. [`ListenerHandle`] only asks it to stop at
//! its next poll.
//!
//! # Example
//!
//! ```no_run
//! use picgrab::listener::{spawn_listener, ListenerConfig, RawModeGuard, TerminalKeySource};
//! use picgrab::signal::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let _raw = RawModeGuard::enable().unwrap();
//! let _handle = spawn_listener(TerminalKeySource, ListenerConfig::default(), token.clone());
//! // ... run the fetch loop; pressing `1` sets `token`.
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use crate::signal::CancellationToken;

/// Source of key events.
pub trait KeyEventSource: Send {
    /// Wait up to `timeout` for the next key event.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    ///
    /// # Errors
    ///
    /// Any error ends the listener.
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyEvent>>;
}

/// Key events from the controlling terminal via crossterm.
///
/// Pair with [`RawModeGuard`] so keys arrive without waiting for Enter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalKeySource;

impl KeyEventSource for TerminalKeySource {
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(Some(key)),
            _ => Ok(None),
        }
    }
}

/// Keeps the terminal in raw mode while alive.
///
/// While raw mode is on, log lines are written with CRLF endings.
#[derive(Debug)]
pub struct RawModeGuard(());

impl RawModeGuard {
    /// Switch the terminal to raw mode.
    ///
    /// # Errors
    ///
    /// Fails when stdin is not a terminal or the mode cannot be changed.
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        crate::logging::set_raw_terminal(true);
        log::debug!("Terminal raw mode enabled");
        Ok(Self(()))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        crate::logging::set_raw_terminal(false);
        log::debug!("Terminal raw mode disabled");
    }
}

/// Listener settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Key that requests cancellation.
    pub cancel_key: char,
    /// How long each poll of the source may block.
    pub poll_interval: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            cancel_key: '1',
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Why the listener thread ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// The cancel key (or Ctrl+C) was pressed.
    CancelKey,
    /// Stopped by its handle, or cancellation came from elsewhere.
    Stopped,
    /// The key source failed.
    SourceError,
}

/// Handle to a running listener. Dropping it stops the listener.
#[derive(Debug)]
pub struct ListenerHandle {
    stop: Arc<AtomicBool>,
}

impl ListenerHandle {
    /// Ask the listener to exit at its next poll. Does not wait.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Whether `key` should cancel the run.
#[must_use]
pub fn is_cancel_key(key: &KeyEvent, cancel_key: char) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => true,
        KeyCode::Char(c) => {
            c == cancel_key
                && !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        }
        _ => false,
    }
}

/// Start the listener on a detached thread.
///
/// # Errors
///
/// Returns an error if the thread cannot be spawned.
pub fn spawn_listener<S>(
    mut source: S,
    config: ListenerConfig,
    token: CancellationToken,
) -> io::Result<ListenerHandle>
where
    S: KeyEventSource + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);

    thread::Builder::new()
        .name("key-listener".to_string())
        .spawn(move || {
            let exit = listen(&mut source, config, &token, &thread_stop);
            log::debug!("Key listener exited: {:?}", exit);
        })?;

    log::info!("Press '{}' to stop downloading", config.cancel_key);
    Ok(ListenerHandle { stop })
}

/// Listener loop body.
pub(crate) fn listen<S: KeyEventSource + ?Sized>(
    source: &mut S,
    config: ListenerConfig,
    token: &CancellationToken,
    stop: &AtomicBool,
) -> ListenerExit {
    loop {
        if stop.load(Ordering::SeqCst) || token.is_requested() {
            return ListenerExit::Stopped;
        }

        match source.next_key(config.poll_interval) {
            Ok(Some(key)) if is_cancel_key(&key, config.cancel_key) => {
                log::info!("Stop key pressed, stopping...");
                token.request();
                return ListenerExit::CancelKey;
            }
            Ok(Some(key)) => log::trace!("Ignoring key {:?}", key.code),
            Ok(None) => {}
            Err(e) => {
                log::warn!("Key listener stopped: {}", e);
                return ListenerExit::SourceError;
            }
        }
    }
}
