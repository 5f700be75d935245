//! Species list refresh from a location-aware listing service.
//!
//! A provider returns the observer location and the species seen there.
//! [`plan_refresh`] flags suspicious locations and decides whether the caller
//! must confirm before the species file is overwritten.

mod error;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument, warn};

pub use error::RefreshError;

use crate::catalog::{SpeciesEntry, write_species};
use crate::transport::RateLimitedTransport;

/// Default timeout for the listing request.
pub const LISTING_TIMEOUT: Duration = Duration::from_secs(15);

/// Observer location and species observed there.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesListing {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Species in listing order.
    pub species: Vec<SpeciesEntry>,
}

#[derive(Debug, Deserialize)]
struct ListingDocument {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    species: Vec<ListingSpecies>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingSpecies {
    #[serde(default)]
    common_name: String,
    #[serde(default)]
    scientific_name: String,
}

/// Parses a listing document, dropping entries without both names.
///
/// # Errors
///
/// Returns the JSON error if `body` is not a listing document.
pub fn parse_listing(body: &str) -> Result<SpeciesListing, serde_json::Error> {
    let document: ListingDocument = serde_json::from_str(body)?;
    let species = document
        .species
        .into_iter()
        .filter_map(|entry| {
            let common = entry.common_name.trim();
            let scientific = entry.scientific_name.trim();
            if common.is_empty() || scientific.is_empty() {
                warn!(common, scientific, "skipping listing entry with a missing name");
                None
            } else {
                Some(SpeciesEntry::new(common, scientific))
            }
        })
        .collect();
    Ok(SpeciesListing {
        latitude: document.latitude,
        longitude: document.longitude,
        species,
    })
}

/// Source of a refreshed species list.
#[async_trait]
pub trait SpeciesProvider: Send + Sync {
    /// Fetches the current listing.
    async fn fetch(&self) -> Result<SpeciesListing, RefreshError>;
}

/// Fetches the listing as JSON over the shared transport.
#[derive(Debug)]
pub struct HttpSpeciesProvider {
    transport: Arc<RateLimitedTransport>,
    url: String,
    timeout: Duration,
}

impl HttpSpeciesProvider {
    /// Creates a provider for `url`.
    #[must_use]
    pub fn new(transport: Arc<RateLimitedTransport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            timeout: LISTING_TIMEOUT,
        }
    }
}

#[async_trait]
impl SpeciesProvider for HttpSpeciesProvider {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<SpeciesListing, RefreshError> {
        let response = self
            .transport
            .get(&self.url, self.timeout)
            .await
            .map_err(|source| RefreshError::Fetch {
                url: self.url.clone(),
                source,
            })?;
        let listing = parse_listing(&response.text()).map_err(|source| RefreshError::Decode {
            url: self.url.clone(),
            source,
        })?;
        if listing.species.is_empty() {
            return Err(RefreshError::Empty {
                url: self.url.clone(),
            });
        }
        info!(species = listing.species.len(), "species listing fetched");
        Ok(listing)
    }
}

/// Warnings about a reported location. Empty when it looks plausible.
#[must_use]
pub fn location_warnings(latitude: f64, longitude: f64) -> Vec<String> {
    let mut warnings = Vec::new();
    if !(-90.0..=90.0).contains(&latitude) {
        warnings.push(format!("latitude {latitude} is outside -90..=90"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        warnings.push(format!("longitude {longitude} is outside -180..=180"));
    }
    if latitude == 0.0 && longitude == 0.0 {
        warnings.push("location is 0, 0; the listing service location is probably unset".to_string());
    }
    warnings
}

/// What the caller should check before writing a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPlan {
    /// Human-readable concerns to show the user.
    pub warnings: Vec<String>,
    /// The user must confirm before the species file is written.
    pub needs_confirmation: bool,
}

/// Decides whether applying `listing` needs confirmation.
///
/// Confirmation is needed when the location looks wrong or an existing
/// species file would be overwritten.
#[must_use]
pub fn plan_refresh(listing: &SpeciesListing, target_exists: bool) -> RefreshPlan {
    let warnings = location_warnings(listing.latitude, listing.longitude);
    RefreshPlan {
        needs_confirmation: target_exists || !warnings.is_empty(),
        warnings,
    }
}

/// Writes the listing's species to `path`.
///
/// # Errors
///
/// Returns [`RefreshError::Write`] if the file cannot be written.
pub fn apply_refresh(path: &Path, listing: &SpeciesListing) -> Result<(), RefreshError> {
    write_species(path, &listing.species)?;
    info!(path = %path.display(), species = listing.species.len(), "species file written");
    Ok(())
}
