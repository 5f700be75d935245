//! Best-effort subject filtering over scraped description text.
//!
//! The blocklist is a heuristic: descriptions come from third-party pages, so
//! false positives and negatives are expected.

/// Default subject keywords that disqualify a candidate.
pub const DEFAULT_BLOCKLIST: [&str; 11] = [
    "egg",
    "map",
    "illustration",
    "drawing",
    "specimen",
    "skeleton",
    "skull",
    "museum",
    "habitat",
    "distribution",
    "preserved",
];

/// Case-insensitive substring blocklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPolicy {
    keywords: Vec<String>,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKLIST)
    }
}

impl ContentPolicy {
    /// Creates a policy from keywords; blanks are ignored.
    #[must_use]
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Returns the first keyword found in `description`, if any.
    #[must_use]
    pub fn rejection(&self, description: &str) -> Option<&str> {
        let haystack = description.to_lowercase();
        self.keywords
            .iter()
            .find(|keyword| haystack.contains(keyword.as_str()))
            .map(String::as_str)
    }

    /// Returns the configured keywords.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}
