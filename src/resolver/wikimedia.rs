//! Wikimedia Commons media-search resolver.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::attribution::{DEFAULT_ATTRIBUTION, attribution_text};
use super::error::ResolveError;
use super::parse::{
    SearchHit, original_image_url, parse_detail_page, parse_search_results, sized_image_url,
};
use super::policy::ContentPolicy;
use super::{ImageCandidate, ImageResolver};
use crate::catalog::SpeciesEntry;
use crate::transport::RateLimitedTransport;
use crate::transport::constants::{DETAIL_PAGE_TIMEOUT, SEARCH_TIMEOUT};

/// Default media search host.
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://commons.wikimedia.org";

/// Default width requested when rewriting thumbnail URLs.
pub const DEFAULT_TARGET_WIDTH: u32 = 1280;

/// Default minimum original width accepted.
pub const DEFAULT_MIN_WIDTH: u32 = 800;

/// Raw results considered per wanted candidate.
const OVER_FETCH_FACTOR: usize = 2;

/// Resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Base URL of the media search site (overridable for tests).
    pub search_base_url: String,
    /// Fetch file pages to filter by subject and resolution, and to read the author.
    pub quality_checks: bool,
    /// Width substituted into thumbnail URLs.
    pub target_width: u32,
    /// Originals narrower than this are rejected.
    pub min_width: u32,
    /// Subject keyword filter.
    pub policy: ContentPolicy,
    /// Timeout for search result pages.
    pub search_timeout: Duration,
    /// Timeout for file pages.
    pub detail_timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            search_base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            quality_checks: true,
            target_width: DEFAULT_TARGET_WIDTH,
            min_width: DEFAULT_MIN_WIDTH,
            policy: ContentPolicy::default(),
            search_timeout: SEARCH_TIMEOUT,
            detail_timeout: DETAIL_PAGE_TIMEOUT,
        }
    }
}

/// Resolves species to image candidates via Wikimedia Commons media search.
pub struct WikimediaResolver {
    transport: Arc<RateLimitedTransport>,
    settings: ResolverSettings,
    base_url: Url,
}

impl std::fmt::Debug for WikimediaResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WikimediaResolver")
            .field("base_url", &self.base_url.as_str())
            .field("quality_checks", &self.settings.quality_checks)
            .finish_non_exhaustive()
    }
}

/// Candidates gathered so far plus every URL form already spoken for.
struct Collection {
    candidates: Vec<ImageCandidate>,
    spent: HashSet<String>,
}

impl Collection {
    fn new(excluded: &HashSet<String>) -> Self {
        let mut spent = excluded.clone();
        spent.extend(excluded.iter().map(|url| original_image_url(url)));
        Self {
            candidates: Vec::new(),
            spent,
        }
    }

    fn is_spent(&self, url: &str) -> bool {
        self.spent.contains(url)
    }

    fn push(&mut self, candidate: ImageCandidate) {
        self.spent.insert(original_image_url(&candidate.source_url));
        self.spent.insert(candidate.source_url.clone());
        self.candidates.push(candidate);
    }
}

impl WikimediaResolver {
    /// Creates a resolver over the shared transport.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidBaseUrl`] if the search base URL does not parse.
    pub fn new(
        transport: Arc<RateLimitedTransport>,
        settings: ResolverSettings,
    ) -> Result<Self, ResolveError> {
        let base_url =
            Url::parse(&settings.search_base_url).map_err(|_| ResolveError::InvalidBaseUrl {
                url: settings.search_base_url.clone(),
            })?;
        Ok(Self {
            transport,
            settings,
            base_url,
        })
    }

    /// Builds the media search URL for a query.
    #[must_use]
    pub fn search_url(&self, query: &str) -> String {
        let mut url = self.base_url.clone();
        url.set_path("/w/index.php");
        url.query_pairs_mut()
            .clear()
            .append_pair("search", query)
            .append_pair("title", "Special:MediaSearch")
            .append_pair("go", "Go")
            .append_pair("type", "image");
        url.to_string()
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ResolveError> {
        let response = self
            .transport
            .get(&self.search_url(query), self.settings.search_timeout)
            .await
            .map_err(|e| ResolveError::search(query, e))?;
        parse_search_results(&response.text(), &self.base_url)
            .map_err(|e| ResolveError::parse(query, e))
    }

    /// Adds up to `count - collected` candidates from one query.
    async fn collect_from_query(&self, query: &str, count: usize, collection: &mut Collection) {
        let wanted = count.saturating_sub(collection.candidates.len());
        if wanted == 0 {
            return;
        }

        let hits = match self.search(query).await {
            Ok(hits) => hits,
            Err(error) => {
                warn!(query, error = %error, "query contributed no candidates");
                return;
            }
        };
        debug!(query, hits = hits.len(), "search results parsed");

        for hit in hits.into_iter().take(wanted * OVER_FETCH_FACTOR) {
            if collection.candidates.len() >= count {
                break;
            }
            if let Some(candidate) = self.evaluate(&hit, collection).await {
                debug!(url = %candidate.source_url, "candidate accepted");
                collection.push(candidate);
            }
        }
    }

    async fn evaluate(&self, hit: &SearchHit, collection: &Collection) -> Option<ImageCandidate> {
        let original = original_image_url(&hit.thumbnail_url);
        let direct = sized_image_url(&hit.thumbnail_url, self.settings.target_width)
            .unwrap_or_else(|| original.clone());

        if collection.is_spent(&direct) || collection.is_spent(&original) {
            debug!(url = %direct, "skipping already known image");
            return None;
        }

        if !self.settings.quality_checks {
            return Some(ImageCandidate {
                source_url: direct,
                attribution: DEFAULT_ATTRIBUTION.to_string(),
            });
        }

        let page = match self
            .transport
            .get(&hit.file_page_url, self.settings.detail_timeout)
            .await
        {
            Ok(response) => parse_detail_page(&response.text()),
            Err(error) => {
                warn!(url = %hit.file_page_url, error = %error, "file page unavailable, dropping candidate");
                return None;
            }
        };

        if let Some(description) = page.description.as_deref()
            && let Some(keyword) = self.settings.policy.rejection(description)
        {
            debug!(url = %hit.file_page_url, keyword, "rejected by subject filter");
            return None;
        }

        let source_url = match page.dimensions {
            Some((width, _)) if width < self.settings.min_width => {
                debug!(url = %hit.file_page_url, width, "original below minimum width");
                return None;
            }
            Some((width, _)) if width <= self.settings.target_width => original,
            _ => direct,
        };

        Some(ImageCandidate {
            source_url,
            attribution: attribution_text(page.author.as_deref()),
        })
    }
}

#[async_trait]
impl ImageResolver for WikimediaResolver {
    #[instrument(skip(self, species, excluded), fields(species = %species.common_name))]
    async fn resolve(
        &self,
        species: &SpeciesEntry,
        count: usize,
        excluded: &HashSet<String>,
    ) -> Vec<ImageCandidate> {
        if count == 0 {
            return Vec::new();
        }

        let mut collection = Collection::new(excluded);

        let primary = format!("{} {} bird", species.common_name, species.scientific_name);
        self.collect_from_query(&primary, count, &mut collection).await;

        if collection.candidates.len() < count {
            let fallback = format!("{} bird", species.common_name);
            debug!(
                found = collection.candidates.len(),
                count, "primary query short, trying fallback"
            );
            self.collect_from_query(&fallback, count, &mut collection).await;
        }

        info!(found = collection.candidates.len(), count, "resolution complete");
        collection.candidates
    }
}
