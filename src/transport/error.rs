//! Error types for the transport module.
//!
//! Every variant carries the URL that failed so per-unit log lines are
//! diagnosable without extra context.

use thiserror::Error;

/// Errors surfaced by [`RateLimitedTransport`](super::RateLimitedTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP status that the caller did not tolerate.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The retry ceiling was reached on rate-limit or transient failures.
    #[error("giving up on {url} after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        /// The URL that kept failing.
        url: String,
        /// Number of attempts made, including the first.
        attempts: u32,
        /// Description of the last failure.
        last: String,
    },

    /// Response body exceeded the configured size limit.
    #[error("response body from {url} exceeds {limit} bytes")]
    BodyTooLarge {
        /// The URL whose body was too large.
        url: String,
        /// The byte limit that was exceeded.
        limit: u64,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The shared HTTP client could not be constructed.
    #[error("HTTP client construction failed: {0}")]
    ClientBuild(String),
}

impl TransportError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a retries-exhausted error.
    pub fn retries_exhausted(url: impl Into<String>, attempts: u32, last: impl Into<String>) -> Self {
        Self::RetriesExhausted {
            url: url.into(),
            attempts,
            last: last.into(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns the HTTP status code when this error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_contains_status_and_url() {
        let error = TransportError::http_status("https://commons.example/file", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("https://commons.example/file"));
        assert_eq!(error.status(), Some(404));
    }

    #[test]
    fn test_retries_exhausted_display() {
        let error = TransportError::retries_exhausted("https://x.example/a", 3, "HTTP 429");
        let msg = error.to_string();
        assert!(msg.contains("3 attempt(s)"));
        assert!(msg.contains("HTTP 429"));
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_invalid_url_display() {
        let error = TransportError::invalid_url("not a url");
        assert!(error.to_string().contains("not a url"));
    }
}
