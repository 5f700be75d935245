//! On-disk image cache: one folder per species, image + sidecar pairs.
//!
//! Layout:
//!
//! ```text
//! <root>/<id>/<id>_<n>.<jpg|jpeg|png>
//! <root>/<id>/<id>_<n>.txt
//! ```
//!
//! Completion is derived from the folder on every call and never stored.
//! The sidecar's `URL:` line is the only record that a URL has been spent;
//! image file names carry no meaning beyond uniqueness within the folder.

mod error;
mod lookup;
pub mod sidecar;

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

pub use error::{CacheError, PersistenceError};
pub use lookup::{CachedAsset, ImageSelector, MISSING_ATTRIBUTION};
pub use sidecar::{Sidecar, format_sidecar, parse_sidecar};

use crate::catalog::SpeciesId;
use crate::resolver::ImageCandidate;

/// Image extensions counted toward completion (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Extension used when none can be derived from the URL.
pub const DEFAULT_EXTENSION: &str = "jpg";

const SIDECAR_EXTENSION: &str = "txt";

/// Paths of one image/sidecar pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImagePaths {
    /// Image file path.
    pub image: PathBuf,
    /// Sidecar file path.
    pub sidecar: PathBuf,
}

/// Result of [`CacheStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Both files were written.
    Written,
    /// The pair already existed; nothing was touched.
    AlreadyPresent,
}

/// Returns true for files with a cached-image extension.
#[must_use]
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Derives the image extension (without dot) from a source URL.
///
/// Uses the last path segment, ignoring anything from the first `(`.
/// Unknown or missing extensions fall back to [`DEFAULT_EXTENSION`].
///
/// ```
/// use birdcache_core::cache::extension_for_url;
///
/// assert_eq!(extension_for_url("https://u.example/a/Robin.PNG"), "png");
/// assert_eq!(extension_for_url("https://u.example/a/Robin.svg"), "jpg");
/// ```
#[must_use]
pub fn extension_for_url(url: &str) -> String {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split('(')
        .next()
        .unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    let decoded = urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |s| s.into_owned());

    decoded
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// The on-disk cache. Owns every species folder under `root`.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Opens (creating if needed) the cache root.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::RootUnavailable`] if the root cannot be created.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>) -> Result<Self, CacheError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| CacheError::RootUnavailable {
            path: root.clone(),
            source,
        })?;
        debug!("cache root ready");
        Ok(Self { root })
    }

    /// Returns the cache root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the folder for a species.
    #[must_use]
    pub fn species_dir(&self, id: &SpeciesId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn entries(&self, id: &SpeciesId) -> Vec<PathBuf> {
        match fs::read_dir(self.species_dir(id)) {
            Ok(read_dir) => read_dir
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Image files in the species folder, sorted by file name.
    #[must_use]
    pub fn image_files(&self, id: &SpeciesId) -> Vec<PathBuf> {
        let mut images: Vec<PathBuf> = self
            .entries(id)
            .into_iter()
            .filter(|path| is_image_file(path))
            .collect();
        images.sort();
        images
    }

    /// Number of image files already cached for the species.
    #[must_use]
    pub fn existing_count(&self, id: &SpeciesId) -> usize {
        self.image_files(id).len()
    }

    /// Source URLs recorded in the species' sidecars.
    #[must_use]
    pub fn known_urls(&self, id: &SpeciesId) -> HashSet<String> {
        self.entries(id)
            .into_iter()
            .filter(|path| path.extension().is_some_and(|ext| ext == SIDECAR_EXTENSION))
            .filter_map(|path| sidecar::read_sidecar(&path))
            .filter_map(|sidecar| sidecar.url)
            .collect()
    }

    /// Whether the species already has at least `target` images.
    #[must_use]
    pub fn is_complete(&self, id: &SpeciesId, target: usize) -> bool {
        self.existing_count(id) >= target
    }

    /// Paths for image number `index`, with the extension derived from `url`.
    #[must_use]
    pub fn image_paths(&self, id: &SpeciesId, index: usize, url: &str) -> CachedImagePaths {
        let dir = self.species_dir(id);
        let stem = format!("{id}_{index}");
        CachedImagePaths {
            image: dir.join(format!("{stem}.{}", extension_for_url(url))),
            sidecar: dir.join(format!("{stem}.{SIDECAR_EXTENSION}")),
        }
    }

    /// Existence predicate checked before any download or write.
    #[must_use]
    pub fn is_saved(&self, paths: &CachedImagePaths) -> bool {
        paths.image.is_file() && paths.sidecar.is_file()
    }

    /// Lowest index `>= start` with no `<id>_<n>.*` file in the folder.
    #[must_use]
    pub fn next_free_index(&self, id: &SpeciesId, start: usize) -> usize {
        let taken: HashSet<String> = self
            .entries(id)
            .into_iter()
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .collect();

        (start.max(1)..)
            .find(|n| !taken.contains(&format!("{id}_{n}")))
            .unwrap_or(start)
    }

    /// Persists one candidate as image number `index`.
    ///
    /// The image is written to a `.part` sibling and renamed into place, then
    /// the sidecar is written. If either file of the pair already exists as a
    /// complete pair, nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] on folder creation or write failure; no
    /// partial pair is left behind.
    #[instrument(skip(self, candidate, bytes), fields(species = %id, index, url = %candidate.source_url))]
    pub fn save(
        &self,
        id: &SpeciesId,
        index: usize,
        candidate: &ImageCandidate,
        bytes: &[u8],
    ) -> Result<SaveOutcome, PersistenceError> {
        let paths = self.image_paths(id, index, &candidate.source_url);
        if self.is_saved(&paths) {
            debug!(path = %paths.image.display(), "image already cached, skipping write");
            return Ok(SaveOutcome::AlreadyPresent);
        }

        let dir = self.species_dir(id);
        fs::create_dir_all(&dir).map_err(|source| PersistenceError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let mut part_name = paths.image.as_os_str().to_os_string();
        part_name.push(".part");
        let part_path = PathBuf::from(part_name);
        if let Err(error) =
            fs::write(&part_path, bytes).and_then(|()| fs::rename(&part_path, &paths.image))
        {
            let _ = fs::remove_file(&part_path);
            return Err(PersistenceError::write(&paths.image, error));
        }

        let text = format_sidecar(&candidate.source_url, &candidate.attribution);
        if let Err(error) = fs::write(&paths.sidecar, text) {
            // An image without a sidecar would count toward completion with no URL record.
            let _ = fs::remove_file(&paths.image);
            return Err(PersistenceError::write(&paths.sidecar, error));
        }

        info!(path = %paths.image.display(), bytes = bytes.len(), "cached image");
        Ok(SaveOutcome::Written)
    }

    /// Removes stale `.part` files left by interrupted writes. Returns how many were removed.
    pub fn remove_partial_files(&self, id: &SpeciesId) -> usize {
        self.entries(id)
            .into_iter()
            .filter(|path| path.extension().is_some_and(|ext| ext == "part"))
            .filter(|path| match fs::remove_file(path) {
                Ok(()) => true,
                Err(error) if error.kind() == ErrorKind::NotFound => false,
                Err(error) => {
                    debug!(path = %path.display(), error = %error, "cannot remove partial file");
                    false
                }
            })
            .count()
    }
}
