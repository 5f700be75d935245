//! Image resolution: species name pair to ranked, attributed image candidates.
//!
//! # Architecture
//!
//! - [`ImageResolver`] - Async trait the builder depends on
//! - [`WikimediaResolver`] - Media search implementation over the shared transport
//! - [`ContentPolicy`] - Best-effort subject keyword filter
//! - [`parse_search_results`] / [`parse_detail_page`] - HTML extraction
//!
//! Resolution never fails outward: a failed search or an unparseable page
//! contributes zero candidates, and a failed file page drops one candidate.

mod attribution;
mod error;
mod parse;
mod policy;
mod utils;
mod wikimedia;

pub use attribution::{DEFAULT_ATTRIBUTION, attribution_text, format_author};
pub use error::{ParseError, ResolveError};
pub use parse::{
    DetailPage, RESULT_ANCHOR_MARKER, SearchHit, original_image_url, parse_detail_page,
    parse_search_results, sized_image_url,
};
pub use policy::{ContentPolicy, DEFAULT_BLOCKLIST};
pub use wikimedia::{
    DEFAULT_MIN_WIDTH, DEFAULT_SEARCH_BASE_URL, DEFAULT_TARGET_WIDTH, ResolverSettings,
    WikimediaResolver,
};

use std::collections::HashSet;

use async_trait::async_trait;

use crate::catalog::SpeciesEntry;

/// An image reference with attribution, not yet downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageCandidate {
    /// Direct image URL.
    pub source_url: String,
    /// Rendered attribution line, e.g. `© Jane Doe`.
    pub attribution: String,
}

/// Turns a species into image candidates.
///
/// Implementations must return at most `count` candidates, none of whose
/// URLs is in `excluded`, with no duplicate URL.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Resolves up to `count` candidates not in `excluded`.
    async fn resolve(
        &self,
        species: &SpeciesEntry,
        count: usize,
        excluded: &HashSet<String>,
    ) -> Vec<ImageCandidate>;
}
