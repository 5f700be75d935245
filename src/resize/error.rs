//! Error types for the resize pass.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a resize pass before any file is touched.
#[derive(Debug, Error)]
pub enum ResizeError {
    /// The cache root does not exist or is not a directory.
    #[error("cache root not found: {path}")]
    RootMissing {
        /// The missing root.
        path: PathBuf,
    },

    /// Worker count of zero.
    #[error("resize worker count must be at least 1")]
    InvalidWorkers,

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Per-file failure. Counted as `errored`; never aborts the pass.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file could not be read or decoded as an image.
    #[error("cannot decode {path}: {source}")]
    Decode {
        /// Offending file.
        path: PathBuf,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// The resized image could not be encoded.
    #[error("cannot encode {path}: {source}")]
    Encode {
        /// Destination file.
        path: PathBuf,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// The temp file could not replace the original.
    #[error("cannot replace {path}: {source}")]
    Replace {
        /// Destination file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl DecodeError {
    pub(crate) fn decode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }
}
