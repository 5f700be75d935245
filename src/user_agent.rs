//! Shared User-Agent string for all outbound requests.
//!
//! Media search, file pages, image downloads and species-list refreshes all go
//! through the same transport, so a single identifying format is used.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/birdcache";

/// Default User-Agent for every transport request.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("birdcache/{version} (offline-image-cache; +{PROJECT_UA_URL})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_version_and_project_url() {
        let ua = default_user_agent();
        assert!(ua.contains(PROJECT_UA_URL), "UA must contain project URL");
        assert_eq!(
            Some(env!("CARGO_PKG_VERSION")),
            ua.strip_prefix("birdcache/")
                .and_then(|s| s.split(' ').next()),
            "UA must contain crate version"
        );
    }

    #[test]
    fn test_user_agent_identifies_purpose() {
        assert!(default_user_agent().contains("offline-image-cache"));
    }
}
