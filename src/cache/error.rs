//! Error types for the on-disk cache.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal cache misconfiguration.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache root cannot be created or is not a directory.
    #[error("cache root {path} is unavailable: {source}\n  Suggestion: check --cache-dir and its permissions")]
    RootUnavailable {
        /// The configured root.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Failure persisting one image/sidecar pair. Contained to that candidate.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The species folder could not be created.
    #[error("cannot create species folder {path}: {source}")]
    CreateDir {
        /// Folder path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written or moved into place.
    #[error("cannot write {path}: {source}")]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl PersistenceError {
    /// Creates a `Write` error.
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
