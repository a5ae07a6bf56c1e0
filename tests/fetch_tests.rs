//! Integration tests for the download loop.
//!
//! Every test drives `Poller::run` with an in-process transport, so no
//! network access is needed.

use picgrab::fetch::naming::is_generated_name;
use picgrab::fetch::{
    AttemptOutcome, FetchError, FetchProgress, HttpResponse, NamingConfig, Poller,
    PollerConfig, Transport, TransportError,
};
use picgrab::signal::CancellationToken;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// =============================================================================
// Test Transports
// =============================================================================

/// Answers every request with the same status and body.
struct FixedTransport {
    status: u16,
    body: Vec<u8>,
    calls: AtomicU32,
}

impl FixedTransport {
    fn ok(body: &[u8]) -> Self {
        Self::with_status(200, body)
    }

    fn with_status(status: u16, body: &[u8]) -> Self {
        Self {
            status,
            body: body.to_vec(),
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for FixedTransport {
    fn get(&self, _url: &str) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse::new(self.status, self.body.clone()))
    }
}

/// Answers with a different body on every call.
#[derive(Default)]
struct CountingTransport {
    calls: AtomicU32,
}

impl Transport for CountingTransport {
    fn get(&self, _url: &str) -> Result<HttpResponse, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse::new(200, format!("image #{n}").into_bytes()))
    }
}

/// Never obtains a response.
struct UnreachableTransport;

impl Transport for UnreachableTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        Err(TransportError::Connect {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn fast_config(dir: &Path, attempts: u32) -> PollerConfig {
    PollerConfig::default()
        .with_url("http://localhost/img")
        .with_directory(dir)
        .with_max_attempts(attempts)
        .with_interval(Duration::ZERO)
        .with_poll_slice(Duration::from_millis(1))
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

// =============================================================================
// Download and Deduplication
// =============================================================================

#[test]
fn test_identical_downloads_leave_one_file() {
    let temp = TempDir::new().unwrap();
    let save_dir = temp.path().join("Saved_Pic");
    let transport = FixedTransport::ok(b"same image bytes");

    let report = Poller::new(fast_config(&save_dir, 3))
        .run(&transport, &CancellationToken::new())
        .unwrap();

    assert_eq!(transport.calls(), 3);
    assert_eq!(report.attempts_made, 3);
    assert_eq!(report.saved.len(), 3);
    assert_eq!(report.bytes_saved, 3 * 16);
    assert!(!report.cancelled);

    // Three distinct names were written before deduplication.
    let names: HashSet<_> = report.saved.iter().collect();
    assert_eq!(names.len(), 3);
    for path in &report.saved {
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(is_generated_name(name, &NamingConfig::default()), "{name}");
    }

    assert_eq!(report.duplicates_removed(), 2);
    let remaining = files_in(&save_dir);
    assert_eq!(remaining.len(), 1);
    assert_eq!(fs::read(&remaining[0]).unwrap(), b"same image bytes");
}

#[test]
fn test_distinct_downloads_are_all_kept() {
    let temp = TempDir::new().unwrap();
    let transport = CountingTransport::default();

    let report = Poller::new(fast_config(temp.path(), 4))
        .run(&transport, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.saved.len(), 4);
    assert_eq!(report.duplicates_removed(), 0);
    assert_eq!(files_in(temp.path()).len(), 4);
}

#[test]
fn test_existing_files_take_part_in_deduplication() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("0000000000.jpg"), b"payload").unwrap();
    let transport = FixedTransport::ok(b"payload");

    let report = Poller::new(fast_config(temp.path(), 2))
        .run(&transport, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.duplicates_removed(), 2);
    assert_eq!(
        files_in(temp.path()),
        vec![temp.path().join("0000000000.jpg")]
    );
}

#[test]
fn test_save_directory_is_created() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("a").join("b");

    Poller::new(fast_config(&nested, 1))
        .run(&FixedTransport::ok(b"x"), &CancellationToken::new())
        .unwrap();

    assert!(nested.is_dir());
    assert_eq!(files_in(&nested).len(), 1);
}

#[test]
fn test_unusable_save_directory_is_fatal() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not_a_dir");
    fs::write(&blocker, b"file").unwrap();
    let transport = FixedTransport::ok(b"x");

    let err = Poller::new(fast_config(&blocker.join("sub"), 3))
        .run(&transport, &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(err, FetchError::CreateDir { .. }));
    assert_eq!(transport.calls(), 0);
}

// =============================================================================
// Failed Attempts
// =============================================================================

#[test]
fn test_http_error_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let transport = FixedTransport::with_status(404, b"not found");

    let report = Poller::new(fast_config(temp.path(), 2))
        .run(&transport, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.attempts_made, 2);
    assert_eq!(report.http_failures, 2);
    assert!(report.saved.is_empty());
    assert!(files_in(temp.path()).is_empty());
    assert!(report.dedup.is_some());
}

#[test]
fn test_network_errors_are_counted_and_loop_continues() {
    let temp = TempDir::new().unwrap();

    let report = Poller::new(fast_config(temp.path(), 3))
        .run(&UnreachableTransport, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.attempts_made, 3);
    assert_eq!(report.network_failures, 3);
    assert!(files_in(temp.path()).is_empty());
}

#[test]
fn test_exhausted_names_are_save_failures() {
    let temp = TempDir::new().unwrap();
    // Occupy every one-character name.
    for c in ('a'..='z').chain('A'..='Z').chain('0'..='9') {
        fs::write(temp.path().join(format!("{c}.jpg")), c.to_string()).unwrap();
    }
    let naming = NamingConfig {
        length: 1,
        extension: "jpg".to_string(),
        max_attempts: 8,
    };

    let report = Poller::new(fast_config(temp.path(), 2).with_naming(naming))
        .run(&FixedTransport::ok(b"new"), &CancellationToken::new())
        .unwrap();

    assert_eq!(report.attempts_made, 2);
    assert_eq!(report.save_failures, 2);
    assert!(report.saved.is_empty());
    assert_eq!(files_in(temp.path()).len(), 62);
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_is_never_written_through() {
    let temp = TempDir::new().unwrap();
    let save_dir = temp.path().join("pics");
    fs::create_dir(&save_dir).unwrap();
    let outside = temp.path().join("outside.bin");

    for c in ('a'..='z').chain('A'..='Z').chain('0'..='8') {
        fs::write(save_dir.join(format!("{c}.jpg")), c.to_string()).unwrap();
    }
    std::os::unix::fs::symlink(&outside, save_dir.join("9.jpg")).unwrap();

    let naming = NamingConfig {
        length: 1,
        extension: "jpg".to_string(),
        max_attempts: 64,
    };
    let report = Poller::new(fast_config(&save_dir, 1).with_naming(naming))
        .run(&FixedTransport::ok(b"payload"), &CancellationToken::new())
        .unwrap();

    assert!(report.saved.is_empty());
    assert_eq!(report.save_failures, 1);
    assert!(!outside.exists());
    assert!(fs::symlink_metadata(save_dir.join("9.jpg"))
        .unwrap()
        .file_type()
        .is_symlink());
}

// =============================================================================
// Cancellation
// =============================================================================

#[test]
fn test_cancel_before_start_still_deduplicates() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.jpg"), b"dup").unwrap();
    fs::write(temp.path().join("b.jpg"), b"dup").unwrap();

    let token = CancellationToken::new();
    token.request();
    let transport = FixedTransport::ok(b"x");

    let report = Poller::new(fast_config(temp.path(), 10))
        .run(&transport, &token)
        .unwrap();

    assert_eq!(transport.calls(), 0);
    assert_eq!(report.attempts_made, 0);
    assert!(report.cancelled);
    assert_eq!(report.duplicates_removed(), 1);
    assert_eq!(files_in(temp.path()), vec![temp.path().join("a.jpg")]);
}

#[test]
fn test_cancel_during_wait_stops_promptly() {
    let temp = TempDir::new().unwrap();
    let config = fast_config(temp.path(), 5)
        .with_interval(Duration::from_secs(30))
        .with_poll_slice(Duration::from_millis(20));
    let transport = FixedTransport::ok(b"x");

    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            token.request();
        })
    };

    let started = Instant::now();
    let report = Poller::new(config).run(&transport, &token).unwrap();
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(transport.calls(), 1);
    assert_eq!(report.attempts_made, 1);
    assert!(report.cancelled);
    assert!(report.dedup.is_some());
    assert_eq!(files_in(temp.path()).len(), 1);
}

#[test]
fn test_no_wait_after_last_attempt() {
    let temp = TempDir::new().unwrap();
    let config = fast_config(temp.path(), 1).with_interval(Duration::from_secs(30));

    let started = Instant::now();
    Poller::new(config)
        .run(&FixedTransport::ok(b"x"), &CancellationToken::new())
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
}

// =============================================================================
// Progress Observer
// =============================================================================

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl FetchProgress for RecordingProgress {
    fn on_start(&self, max_attempts: u32) {
        self.events.lock().unwrap().push(format!("start {max_attempts}"));
    }

    fn on_attempt(&self, attempt: u32, outcome: &AttemptOutcome) {
        let kind = match outcome {
            AttemptOutcome::Saved { .. } => "saved",
            AttemptOutcome::HttpStatus(_) => "http",
            AttemptOutcome::Network(_) => "network",
            AttemptOutcome::SaveFailed(_) => "save_failed",
        };
        self.events.lock().unwrap().push(format!("{attempt} {kind}"));
    }

    fn on_finish(&self) {
        self.events.lock().unwrap().push("finish".to_string());
    }
}

#[test]
fn test_progress_observer_sees_every_attempt() {
    let temp = TempDir::new().unwrap();
    let progress = Arc::new(RecordingProgress::default());

    Poller::new(fast_config(temp.path(), 2))
        .with_progress(progress.clone())
        .run(&FixedTransport::with_status(500, b""), &CancellationToken::new())
        .unwrap();

    assert_eq!(
        *progress.events.lock().unwrap(),
        vec!["start 2", "1 http", "2 http", "finish"]
    );
}
