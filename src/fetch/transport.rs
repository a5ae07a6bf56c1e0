//! HTTP transport.
//!
//! The fetch loop only needs "GET this URL, give me the status and the
//! body". [`Transport`] is that seam; [`HttpTransport`] implements it with a
//! blocking `reqwest` client, and tests substitute their own.

use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Full response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request that produced no HTTP response at all.
///
/// Timeouts, refused connections, DNS failures and truncated bodies end up
/// here. Non-2xx statuses are *not* transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request did not complete within the timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The connection could not be established.
    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    /// Any other failure while sending or reading.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
}

/// Something that can perform a GET request.
pub trait Transport: Send + Sync {
    /// Issue one GET to `url` and read the whole body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response could be obtained.
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// Blocking `reqwest` transport with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("picgrab/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: url.to_string(),
                }
            } else if e.is_connect() {
                TransportError::Connect {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            } else {
                TransportError::Request {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let response = self.client.get(url).send().map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(classify)?;
        log::trace!("GET {} -> {} ({} bytes)", url, status, body.len());

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
