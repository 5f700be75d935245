//! Attribution text derived from a file page's "Author" cell.

/// Maximum author length before truncation.
const MAX_AUTHOR_CHARS: usize = 20;

/// Attribution used when no author can be extracted.
pub const DEFAULT_ATTRIBUTION: &str = "© Wikimedia Commons";

/// Cleans and shortens an author string.
///
/// Anything from a `[a]` footnote marker on is dropped. Authors longer than
/// 20 characters are cut at the last space inside the first 20 characters
/// (or hard-cut at 20 if there is none) and suffixed with `...`.
///
/// ```
/// use birdcache_core::resolver::format_author;
///
/// assert_eq!(format_author("Jane Doe"), "Jane Doe");
/// assert_eq!(format_author("Bartholomew Featherstonehaugh"), "Bartholomew...");
/// ```
#[must_use]
pub fn format_author(raw: &str) -> String {
    let cleaned = raw.split("[a]").next().unwrap_or_default().trim();
    if cleaned.chars().count() <= MAX_AUTHOR_CHARS {
        return cleaned.to_string();
    }

    let head: String = cleaned.chars().take(MAX_AUTHOR_CHARS).collect();
    match head.rfind(' ') {
        Some(cut) => format!("{}...", &head[..cut]),
        None => format!("{head}..."),
    }
}

/// Renders the final `© <author>` line from the raw "Author" cell text.
///
/// Text from the first `(` on (licence notes, usernames) is discarded.
#[must_use]
pub fn attribution_text(author_cell: Option<&str>) -> String {
    let author = author_cell
        .map(|cell| cell.split('(').next().unwrap_or_default().trim())
        .map(format_author)
        .unwrap_or_default();

    if author.is_empty() {
        DEFAULT_ATTRIBUTION.to_string()
    } else {
        format!("© {author}")
    }
}
