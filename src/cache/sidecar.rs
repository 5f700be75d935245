//! Attribution sidecar format.
//!
//! A sidecar is the text file next to a cached image:
//!
//! ```text
//! URL: <source url>
//! Attribution: <attribution text>
//! ```
//!
//! Its `URL:` line is the durable record that a URL has been downloaded.
//! Older caches hold a single line with only the attribution text.

use std::fs;
use std::path::Path;

const URL_PREFIX: &str = "URL:";
const ATTRIBUTION_PREFIX: &str = "Attribution:";

/// Parsed sidecar contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sidecar {
    /// Recorded source URL, absent in legacy sidecars.
    pub url: Option<String>,
    /// Attribution text.
    pub attribution: Option<String>,
}

/// Renders sidecar text.
#[must_use]
pub fn format_sidecar(url: &str, attribution: &str) -> String {
    format!("{URL_PREFIX} {url}\n{ATTRIBUTION_PREFIX} {attribution}\n")
}

/// Parses sidecar text, accepting the legacy attribution-only form.
#[must_use]
pub fn parse_sidecar(text: &str) -> Sidecar {
    let mut sidecar = Sidecar::default();
    for line in text.lines() {
        if let Some(url) = line.strip_prefix(URL_PREFIX) {
            sidecar.url = Some(url.trim().to_string()).filter(|u| !u.is_empty());
        } else if let Some(attribution) = line.strip_prefix(ATTRIBUTION_PREFIX) {
            sidecar.attribution = Some(attribution.trim().to_string()).filter(|a| !a.is_empty());
        }
    }

    if sidecar.url.is_none() && sidecar.attribution.is_none() {
        let legacy = text.trim();
        if !legacy.is_empty() {
            sidecar.attribution = Some(legacy.to_string());
        }
    }
    sidecar
}

/// Reads and parses a sidecar; `None` if it cannot be read.
#[must_use]
pub fn read_sidecar(path: &Path) -> Option<Sidecar> {
    fs::read_to_string(path).ok().map(|text| parse_sidecar(&text))
}
