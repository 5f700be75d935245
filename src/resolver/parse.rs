//! HTML parsing for media search result pages and file (detail) pages.
//!
//! The parser depends on a small set of structural markers. When they are
//! missing the caller gets a [`ParseError`], which the resolver turns into
//! zero candidates.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::error::ParseError;
use super::utils::{
    absolutize_url, collapse_whitespace, compile_static_regex, compile_static_selector,
    truncate_chars,
};

/// Marker for one image result on the media search page.
pub const RESULT_ANCHOR_MARKER: &str = "a.sdms-image-result";

/// Maximum description length kept for keyword filtering.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

static RESULT_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(RESULT_ANCHOR_MARKER));
static IMG: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("img"));
static TD: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("td"));
static TD_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("td.description"));
static ANY_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(".description"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("title"));
static FILE_INFO: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(".fullMedia, .fileInfo"));

static THUMB_WIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^(?P<pre>.*?)(?P<width>\d+)px-(?P<rest>.+)$"));
static DIMENSIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(\d[\d,.]*)\s*×\s*(\d[\d,.]*)\s*pixels"));

/// One usable anchor from a search results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Absolute URL of the file (detail) page.
    pub file_page_url: String,
    /// Absolute URL of the result thumbnail.
    pub thumbnail_url: String,
}

/// Facts extracted from a file page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailPage {
    /// Short description (at most 200 chars), or the page title.
    pub description: Option<String>,
    /// Raw text of the cell next to the "Author" label.
    pub author: Option<String>,
    /// Original file dimensions `(width, height)`.
    pub dimensions: Option<(u32, u32)>,
}

/// Extracts result anchors in page order, de-duplicated by file page URL.
///
/// # Errors
///
/// - [`ParseError::MissingMarker`] when no result anchor is present
/// - [`ParseError::UnusableResults`] when anchors exist but none is usable
pub fn parse_search_results(html: &str, base_url: &Url) -> Result<Vec<SearchHit>, ParseError> {
    let document = Html::parse_document(html);
    let anchors: Vec<ElementRef<'_>> = document.select(&RESULT_ANCHOR).collect();
    if anchors.is_empty() {
        return Err(ParseError::MissingMarker {
            marker: RESULT_ANCHOR_MARKER,
        });
    }

    let mut seen = HashSet::new();
    let mut hits = Vec::new();
    for anchor in &anchors {
        let Some(file_page_url) = anchor
            .value()
            .attr("href")
            .and_then(|href| absolutize_url(href, base_url))
        else {
            continue;
        };
        let Some(thumbnail_url) = anchor
            .select(&IMG)
            .next()
            .and_then(|img| img.value().attr("data-src").or_else(|| img.value().attr("src")))
            .and_then(|src| absolutize_url(src, base_url))
        else {
            continue;
        };
        if seen.insert(file_page_url.clone()) {
            hits.push(SearchHit {
                file_page_url,
                thumbnail_url,
            });
        }
    }

    if hits.is_empty() {
        return Err(ParseError::UnusableResults {
            found: anchors.len(),
        });
    }
    Ok(hits)
}

/// Builds a direct URL at `width` pixels by rewriting the thumbnail's width token.
///
/// Returns `None` for URLs that are not scaled thumbnails.
///
/// ```
/// use birdcache_core::resolver::sized_image_url;
///
/// let thumb = "https://upload.wikimedia.org/wikipedia/commons/thumb/b/b8/Robin.jpg/250px-Robin.jpg";
/// assert_eq!(
///     sized_image_url(thumb, 1280).as_deref(),
///     Some("https://upload.wikimedia.org/wikipedia/commons/thumb/b/b8/Robin.jpg/1280px-Robin.jpg")
/// );
/// ```
#[must_use]
pub fn sized_image_url(thumbnail_url: &str, width: u32) -> Option<String> {
    if !thumbnail_url.contains("/thumb/") {
        return None;
    }
    let (prefix, last) = thumbnail_url.rsplit_once('/')?;
    let caps = THUMB_WIDTH_RE.captures(last)?;
    Some(format!("{prefix}/{}{width}px-{}", &caps["pre"], &caps["rest"]))
}

/// Maps a thumbnail URL to the original file URL.
///
/// The `/thumb/` segment is removed along with the trailing sized filename.
/// URLs that are not thumbnails are returned unchanged.
#[must_use]
pub fn original_image_url(thumbnail_url: &str) -> String {
    if !thumbnail_url.contains("/thumb/") {
        return thumbnail_url.to_string();
    }
    let unthumbed = thumbnail_url.replacen("/thumb/", "/", 1);
    match unthumbed.rsplit_once('/') {
        Some((original, _)) => original.to_string(),
        None => unthumbed,
    }
}

/// Extracts description, author and dimensions from a file page.
#[must_use]
pub fn parse_detail_page(html: &str) -> DetailPage {
    let document = Html::parse_document(html);
    DetailPage {
        description: extract_description(&document),
        author: extract_author(&document),
        dimensions: extract_dimensions(&document),
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn extract_description(document: &Html) -> Option<String> {
    let from_cells = document
        .select(&TD_DESCRIPTION)
        .chain(document.select(&ANY_DESCRIPTION))
        .map(|el| element_text(&el))
        .find(|text| !text.is_empty());

    from_cells
        .or_else(|| {
            document
                .select(&TITLE)
                .next()
                .map(|el| element_text(&el))
                .filter(|text| !text.is_empty())
        })
        .map(|text| truncate_chars(&text, MAX_DESCRIPTION_CHARS))
}

fn extract_author(document: &Html) -> Option<String> {
    let label = document
        .select(&TD)
        .find(|td| element_text(td).eq_ignore_ascii_case("author"))?;

    label
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "td")
        .map(|cell| element_text(&cell))
        .filter(|text| !text.is_empty())
}

fn extract_dimensions(document: &Html) -> Option<(u32, u32)> {
    let info_text = document
        .select(&FILE_INFO)
        .map(|el| element_text(&el))
        .collect::<Vec<_>>()
        .join(" ");
    find_dimensions(&info_text).or_else(|| find_dimensions(&element_text(&document.root_element())))
}

fn find_dimensions(text: &str) -> Option<(u32, u32)> {
    let caps = DIMENSIONS_RE.captures(text)?;
    Some((parse_grouped_number(&caps[1])?, parse_grouped_number(&caps[2])?))
}

fn parse_grouped_number(value: &str) -> Option<u32> {
    value
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()
}
