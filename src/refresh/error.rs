//! Error types for species list refresh.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::transport::TransportError;

/// Errors from fetching or applying a refreshed species list.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The listing endpoint could not be fetched.
    #[error("cannot fetch species listing from {url}: {source}")]
    Fetch {
        /// Endpoint URL.
        url: String,
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },

    /// The listing body is not the expected JSON document.
    #[error("invalid species listing from {url}: {source}")]
    Decode {
        /// Endpoint URL.
        url: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The listing contained no usable species.
    #[error("species listing from {url} contains no usable entries")]
    Empty {
        /// Endpoint URL.
        url: String,
    },

    /// The refreshed list could not be written.
    #[error(transparent)]
    Write(#[from] CatalogError),
}
