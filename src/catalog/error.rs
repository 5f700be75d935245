//! Error types for species catalog I/O.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing a species list.
///
/// [`load_species`](super::load_species) never surfaces these; it logs them and
/// degrades to an empty work list.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The species file does not exist.
    #[error("species file not found: {path}\n  Suggestion: pass --species-file or run `birdcache refresh`")]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The file exists but could not be read as CSV.
    #[error("cannot read species file {path}: {source}")]
    Read {
        /// Path being read.
        path: PathBuf,
        /// Underlying CSV/I-O error.
        #[source]
        source: csv::Error,
    },

    /// The refreshed list could not be written.
    #[error("cannot write species file {path}: {source}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    /// Builds a read error, mapping a missing file to [`CatalogError::NotFound`].
    #[must_use]
    pub fn read(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        let path = path.into();
        if let csv::ErrorKind::Io(io) = source.kind()
            && io.kind() == std::io::ErrorKind::NotFound
        {
            return Self::NotFound { path };
        }
        Self::Read { path, source }
    }

    /// Builds a write error.
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
