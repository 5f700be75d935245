//! Species work list: loading, validation and writing.
//!
//! The list is a header-skipped, two-column CSV of
//! `commonName, scientificName`. Loading is fail-soft: a missing or unreadable
//! file yields an empty list and a warning, never an error, so a misconfigured
//! build degrades to "nothing to do".

mod error;
mod species_id;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

pub use error::CatalogError;
pub use species_id::{SpeciesId, sanitize};

/// Header written by [`write_species`].
const HEADER: [&str; 2] = ["common_name", "scientific_name"];

/// One species to cache images for. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpeciesEntry {
    /// Common (display) name, e.g. "American Robin".
    pub common_name: String,
    /// Binomial name, e.g. "Turdus migratorius".
    pub scientific_name: String,
}

impl SpeciesEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(common_name: impl Into<String>, scientific_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            scientific_name: scientific_name.into(),
        }
    }

    /// Cache folder id derived from the common name.
    #[must_use]
    pub fn folder_id(&self) -> SpeciesId {
        SpeciesId::from_common_name(&self.common_name)
    }
}

/// Reads a species list strictly.
///
/// The first row is treated as a header. Rows with fewer than two fields, or
/// with an empty field after trimming, are skipped.
///
/// # Errors
///
/// Returns [`CatalogError`] if the file is missing or cannot be read.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_species(path: &Path) -> Result<Vec<SpeciesEntry>, CatalogError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| CatalogError::read(path, e))?;

    let mut entries = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(error) if error.is_io_error() => return Err(CatalogError::read(path, error)),
            Err(error) => {
                debug!(row = row + 2, error = %error, "skipping unreadable row");
                continue;
            }
        };

        match (record.get(0), record.get(1)) {
            (Some(common), Some(scientific)) if !common.is_empty() && !scientific.is_empty() => {
                entries.push(SpeciesEntry::new(common, scientific));
            }
            _ => debug!(row = row + 2, "skipping incomplete row"),
        }
    }

    Ok(entries)
}

/// Loads the species list, degrading to an empty list on any failure.
///
/// Also warns about repeated common names and about entries whose folder ids
/// collide.
#[must_use]
pub fn load_species(path: &Path) -> Vec<SpeciesEntry> {
    match read_species(path) {
        Ok(entries) => {
            info!(path = %path.display(), count = entries.len(), "loaded species list");
            warn_on_duplicate_names(&entries);
            warn_on_folder_collisions(&entries);
            entries
        }
        Err(error) => {
            warn!(error = %error, "species list unavailable, nothing to do");
            Vec::new()
        }
    }
}

/// Logs a warning for every common name listed more than once, and returns
/// those names in first-seen order.
///
/// Repeats are kept in the list; the build pass runs each name once.
pub fn warn_on_duplicate_names(entries: &[SpeciesEntry]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut duplicates = Vec::new();
    for entry in entries {
        let seen = counts.entry(entry.common_name.as_str()).or_default();
        *seen += 1;
        if *seen == 2 {
            duplicates.push(entry.common_name.clone());
        }
    }

    for name in &duplicates {
        warn!(species = %name, rows = counts[name.as_str()], "species listed more than once");
    }
    duplicates
}

/// Logs a warning for every folder id shared by more than one distinct
/// common name, and returns those groups.
///
/// Colliding entries are neither dropped nor renamed; they share a folder.
pub fn warn_on_folder_collisions(entries: &[SpeciesEntry]) -> Vec<(SpeciesId, Vec<String>)> {
    let mut by_id: BTreeMap<SpeciesId, Vec<String>> = BTreeMap::new();
    for entry in entries {
        let names = by_id.entry(entry.folder_id()).or_default();
        if !names.contains(&entry.common_name) {
            names.push(entry.common_name.clone());
        }
    }

    let collisions: Vec<_> = by_id
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .collect();
    for (id, names) in &collisions {
        warn!(folder = %id, names = ?names, "species share a cache folder");
    }
    collisions
}

/// Writes a species list, replacing `path` atomically via a sibling temp file.
///
/// # Errors
///
/// Returns [`CatalogError::Write`] on any I/O failure.
#[instrument(skip(entries), fields(path = %path.display(), count = entries.len()))]
pub fn write_species(path: &Path, entries: &[SpeciesEntry]) -> Result<(), CatalogError> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| CatalogError::write(parent, e))?;
    }

    let result = write_csv(&tmp_path, entries).and_then(|()| fs::rename(&tmp_path, path));
    if let Err(error) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(CatalogError::write(path, error));
    }

    debug!("species list written");
    Ok(())
}

fn write_csv(path: &Path, entries: &[SpeciesEntry]) -> std::io::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADER)?;
    for entry in entries {
        writer.write_record([&entry.common_name, &entry.scientific_name])?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?
        .sync_all()
}
