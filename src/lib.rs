//! Birdcache Core Library
//!
//! Builds and maintains an offline cache of attributed bird photographs for a
//! species list, so a display device can show images without network access.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`catalog`] - Species list loading, folder ids, refreshed list writing
//! - [`transport`] - Rate-limited HTTP with retry and `Retry-After` handling
//! - [`resolver`] - Species to attributed image candidates via media search
//! - [`cache`] - On-disk image + sidecar layout, idempotent saves, display lookup
//! - [`builder`] - Bounded worker pool that fills the cache
//! - [`resize`] - Bounded pool that shrinks oversized cached images
//! - [`refresh`] - Species list refresh from a listing service
//! - [`progress`] - Shared completion counter for the worker pools

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod cache;
pub mod catalog;
pub mod progress;
pub mod refresh;
pub mod resize;
pub mod resolver;
pub mod transport;
mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use builder::{BuildError, BuildReport, BuildSettings, CacheBuilder, SpeciesOutcome};
pub use cache::{CacheError, CacheStore, ImageSelector};
pub use catalog::{CatalogError, SpeciesEntry, SpeciesId, load_species};
pub use refresh::{HttpSpeciesProvider, RefreshError, SpeciesProvider, plan_refresh};
pub use resize::{ResizeCounts, ResizeError, ResizeSettings, Resizer};
pub use resolver::{ImageCandidate, ImageResolver, ResolverSettings, WikimediaResolver};
pub use transport::{RateLimitedTransport, RateLimiter, RetryPolicy, TransportError};
