//! Folder identifiers derived from species common names.

use std::fmt;

/// Sanitized cache folder key for one species.
///
/// Derived from the common name by keeping alphanumerics, spaces and
/// underscores, trimming trailing whitespace and replacing spaces with
/// underscores. Two different names may map to the same id; they then share
/// a cache folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesId(String);

impl SpeciesId {
    /// Derives the id for a common name.
    #[must_use]
    pub fn from_common_name(common_name: &str) -> Self {
        Self(sanitize(common_name))
    }

    /// Returns the id as a folder/file stem.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SpeciesId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sanitizes a common name into a folder-safe identifier.
///
/// ```
/// use birdcache_core::catalog::sanitize;
///
/// assert_eq!(sanitize("Black-capped Chickadee"), "Blackcapped_Chickadee");
/// assert_eq!(sanitize("Steller's Jay  "), "Stellers_Jay");
/// ```
#[must_use]
pub fn sanitize(common_name: &str) -> String {
    let kept: String = common_name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    kept.trim_end().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_is_deterministic() {
        let first = sanitize("Black-capped Chickadee");
        let second = sanitize("Black-capped Chickadee");
        assert_eq!(first, second);
        assert_eq!(first, "Blackcapped_Chickadee");
    }

    #[test]
    fn test_sanitize_output_alphabet() {
        let id = sanitize("Ruby-throated Hummingbird (adult/male) #2");
        assert!(id.chars().all(|c| c.is_alphanumeric() || c == '_'), "{id}");
        assert!(!id.contains(' '));
    }

    #[test]
    fn test_sanitize_trims_trailing_only() {
        assert_eq!(sanitize("Blue Jay \t"), "Blue_Jay");
        assert_eq!(sanitize(" Blue Jay"), "_Blue_Jay");
    }

    #[test]
    fn test_sanitize_keeps_unicode_letters() {
        assert_eq!(sanitize("Mésange charbonnière"), "Mésange_charbonnière");
    }

    #[test]
    fn test_sanitize_collision_is_possible() {
        assert_eq!(sanitize("Grey-Jay"), sanitize("GreyJay"));
    }

    #[test]
    fn test_species_id_display_matches_sanitized() {
        let id = SpeciesId::from_common_name("American Robin");
        assert_eq!(id.to_string(), "American_Robin");
        assert_eq!(id.as_str(), "American_Robin");
    }
}
