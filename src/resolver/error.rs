//! Error types for image resolution.
//!
//! These never leave the resolver: a failed query is logged and contributes
//! zero candidates, following the What/Why/Fix pattern in the log line.

use thiserror::Error;

use crate::transport::TransportError;

/// The page did not have the structure the parser depends on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// None of the expected result anchors were present.
    #[error(
        "no '{marker}' markers in search results page\n  Suggestion: the media search layout may have changed"
    )]
    MissingMarker {
        /// CSS selector that matched nothing.
        marker: &'static str,
    },

    /// Anchors were found but none carried a usable link and thumbnail.
    #[error("{found} result anchor(s) found but none had a file link and thumbnail")]
    UnusableResults {
        /// Number of anchors that were present.
        found: usize,
    },
}

/// Why one search query contributed nothing.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The search request itself failed.
    #[error("search for '{query}' failed: {source}")]
    Search {
        /// The query text.
        query: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },

    /// The search page could not be parsed.
    #[error("search for '{query}' returned an unparseable page: {source}")]
    Parse {
        /// The query text.
        query: String,
        /// Parse failure.
        #[source]
        source: ParseError,
    },

    /// The configured search base URL is not a valid URL.
    #[error("invalid search base URL '{url}'\n  Suggestion: pass an absolute http(s) URL to --search-url")]
    InvalidBaseUrl {
        /// The rejected value.
        url: String,
    },
}

impl ResolveError {
    /// Creates a `Search` error.
    #[must_use]
    pub fn search(query: &str, source: TransportError) -> Self {
        Self::Search {
            query: query.to_string(),
            source,
        }
    }

    /// Creates a `Parse` error.
    #[must_use]
    pub fn parse(query: &str, source: ParseError) -> Self {
        Self::Parse {
            query: query.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_marker() {
        let error = ResolveError::parse(
            "Blue Jay bird",
            ParseError::MissingMarker {
                marker: "a.sdms-image-result",
            },
        );
        let msg = error.to_string();
        assert!(msg.contains("Blue Jay bird"));
        assert!(msg.contains("a.sdms-image-result"));
    }

    #[test]
    fn test_search_error_includes_transport_cause() {
        let error = ResolveError::search(
            "Blue Jay bird",
            TransportError::http_status("https://commons.example/w/index.php", 503),
        );
        assert!(error.to_string().contains("503"));
    }
}
