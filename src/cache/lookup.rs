//! Display-side lookup: pick one cached image for a species and read its attribution.
//!
//! The front end only lists image files and reads the matching sidecar, so
//! this works on any cache folder, including ones written by older tools.

use std::path::PathBuf;

use rand::Rng;
use tracing::debug;

use super::CacheStore;
use super::sidecar::read_sidecar;
use crate::catalog::SpeciesId;

/// Attribution shown when an image has no readable sidecar.
pub const MISSING_ATTRIBUTION: &str = "N/A";

/// How to choose among a species' cached images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSelector {
    /// Use the last digit of a detection timestamp, modulo the image count.
    /// Falls back to random when the last character is not a digit.
    Timestamp(String),
    /// Uniformly random.
    Random,
}

/// One image chosen for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    /// Absolute path of the image file.
    pub image_path: PathBuf,
    /// `<id>/<file name>`, relative to the cache root, with `/` separators.
    pub relative_url: String,
    /// Attribution text, or [`MISSING_ATTRIBUTION`].
    pub attribution: String,
}

impl CacheStore {
    /// Picks a cached image for `common_name`; `None` if the species has none.
    #[must_use]
    pub fn pick_image(&self, common_name: &str, selector: &ImageSelector) -> Option<CachedAsset> {
        let id = SpeciesId::from_common_name(common_name);
        let images = self.image_files(&id);
        if images.is_empty() {
            debug!(species = common_name, "no cached images");
            return None;
        }

        let index = match selector {
            ImageSelector::Timestamp(stamp) => stamp
                .chars()
                .last()
                .and_then(|c| c.to_digit(10))
                .map_or_else(|| random_index(images.len()), |d| d as usize % images.len()),
            ImageSelector::Random => random_index(images.len()),
        };

        let image_path = images[index].clone();
        let file_name = image_path.file_name()?.to_string_lossy().into_owned();
        let attribution = read_sidecar(&image_path.with_extension("txt"))
            .and_then(|sidecar| sidecar.attribution)
            .unwrap_or_else(|| MISSING_ATTRIBUTION.to_string());

        Some(CachedAsset {
            relative_url: format!("{id}/{file_name}"),
            image_path,
            attribution,
        })
    }
}

fn random_index(len: usize) -> usize {
    rand::thread_rng().gen_range(0..len)
}
