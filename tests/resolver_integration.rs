//! Integration tests for the resolver module.
//!
//! Runs the media search resolver against a mock search site.

use std::collections::HashSet;
use std::sync::Arc;

use birdcache_core::catalog::SpeciesEntry;
use birdcache_core::resolver::{
    DEFAULT_ATTRIBUTION, ImageResolver, ResolverSettings, WikimediaResolver,
};
use birdcache_core::transport::{RateLimitedTransport, RateLimiter, RetryPolicy};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::pages::{detail_page, original_path, search_page, sized_path};
use support::socket_guard::start_mock_server_or_skip;

const PRIMARY_QUERY: &str = "American Robin Turdus migratorius bird";
const FALLBACK_QUERY: &str = "American Robin bird";

fn robin() -> SpeciesEntry {
    SpeciesEntry::new("American Robin", "Turdus migratorius")
}

fn resolver(server: &MockServer, quality_checks: bool) -> (WikimediaResolver, Arc<RateLimitedTransport>) {
    let transport = Arc::new(
        RateLimitedTransport::new(RetryPolicy::with_max_attempts(1), RateLimiter::disabled())
            .expect("transport"),
    );
    let settings = ResolverSettings {
        search_base_url: server.uri(),
        quality_checks,
        ..ResolverSettings::default()
    };
    let resolver = WikimediaResolver::new(Arc::clone(&transport), settings).expect("resolver");
    (resolver, transport)
}

async fn mount_search(server: &MockServer, query: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/w/index.php"))
        .and(query_param("search", query))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, file: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/wiki/File:{file}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_resolve_applies_quality_checks() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let host = server.uri();
    mount_search(
        &server,
        PRIMARY_QUERY,
        search_page(&host, &["Robin1.jpg", "RobinEgg.jpg", "Robin3.jpg"]),
    )
    .await;
    mount_detail(
        &server,
        "Robin1.jpg",
        detail_page("Jane Doe (talk)", "An American robin on a fence post", 2000, 1500),
    )
    .await;
    mount_detail(
        &server,
        "RobinEgg.jpg",
        detail_page("John Roe", "Robin egg in a nest", 3000, 2000),
    )
    .await;
    mount_detail(
        &server,
        "Robin3.jpg",
        detail_page("", "Turdus migratorius, adult male", 1000, 800),
    )
    .await;

    let (resolver, _) = resolver(&server, true);
    let candidates = resolver.resolve(&robin(), 2, &HashSet::new()).await;

    assert_eq!(candidates.len(), 2);
    assert_eq!(
        candidates[0].source_url,
        format!("{host}{}", sized_path("Robin1.jpg", 1280))
    );
    assert_eq!(candidates[0].attribution, "© Jane Doe");
    assert_eq!(
        candidates[1].source_url,
        format!("{host}{}", original_path("Robin3.jpg"))
    );
    assert_eq!(candidates[1].attribution, DEFAULT_ATTRIBUTION);
}

#[tokio::test]
async fn test_resolve_rejects_low_resolution_originals() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let host = server.uri();
    mount_search(&server, PRIMARY_QUERY, search_page(&host, &["Tiny.jpg"])).await;
    mount_search(&server, FALLBACK_QUERY, search_page(&host, &["Tiny.jpg"])).await;
    mount_detail(&server, "Tiny.jpg", detail_page("A. Birder", "American robin", 640, 480)).await;

    let (resolver, _) = resolver(&server, true);
    let candidates = resolver.resolve(&robin(), 1, &HashSet::new()).await;

    assert!(candidates.is_empty());
}

#[tokio::test]
async fn test_resolve_never_returns_excluded_urls() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let host = server.uri();
    mount_search(
        &server,
        PRIMARY_QUERY,
        search_page(&host, &["Robin1.jpg", "Robin2.jpg"]),
    )
    .await;
    mount_search(&server, FALLBACK_QUERY, search_page(&host, &["Robin1.jpg"])).await;

    let excluded: HashSet<String> = [format!("{host}{}", sized_path("Robin1.jpg", 1280))]
        .into_iter()
        .collect();

    let (resolver, _) = resolver(&server, false);
    let candidates = resolver.resolve(&robin(), 3, &excluded).await;

    assert_eq!(candidates.len(), 1);
    assert_eq!(
        candidates[0].source_url,
        format!("{host}{}", sized_path("Robin2.jpg", 1280))
    );
    assert!(candidates.iter().all(|c| !excluded.contains(&c.source_url)));
}

#[tokio::test]
async fn test_resolve_excludes_original_form_of_cached_image() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let host = server.uri();
    mount_search(&server, PRIMARY_QUERY, search_page(&host, &["Robin3.jpg"])).await;
    mount_search(&server, FALLBACK_QUERY, search_page(&host, &["Robin3.jpg"])).await;
    mount_detail(&server, "Robin3.jpg", detail_page("Ann", "American robin", 1000, 800)).await;

    let excluded: HashSet<String> = [format!("{host}{}", original_path("Robin3.jpg"))]
        .into_iter()
        .collect();

    let (resolver, _) = resolver(&server, true);
    assert!(resolver.resolve(&robin(), 1, &excluded).await.is_empty());
}

#[tokio::test]
async fn test_resolve_falls_back_to_common_name_query() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let host = server.uri();
    mount_search(
        &server,
        PRIMARY_QUERY,
        "<html><body><p>No results</p></body></html>".to_string(),
    )
    .await;
    mount_search(
        &server,
        FALLBACK_QUERY,
        search_page(&host, &["Fallback1.jpg", "Fallback2.jpg"]),
    )
    .await;

    let (resolver, transport) = resolver(&server, false);
    let candidates = resolver.resolve(&robin(), 2, &HashSet::new()).await;

    assert_eq!(candidates.len(), 2);
    assert_eq!(transport.requests_issued(), 2);
    assert!(candidates.iter().all(|c| c.attribution == DEFAULT_ATTRIBUTION));
}

#[tokio::test]
async fn test_resolve_without_quality_checks_skips_file_pages() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let host = server.uri();
    mount_search(
        &server,
        PRIMARY_QUERY,
        search_page(&host, &["Robin1.jpg", "Robin2.jpg", "Robin3.jpg"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path_regex(r"^/wiki/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (resolver, transport) = resolver(&server, false);
    let candidates = resolver.resolve(&robin(), 3, &HashSet::new()).await;

    assert_eq!(candidates.len(), 3);
    assert_eq!(transport.requests_issued(), 1);
    let unique: HashSet<_> = candidates.iter().map(|c| c.source_url.clone()).collect();
    assert_eq!(unique.len(), 3);
}

#[tokio::test]
async fn test_resolve_search_failure_yields_no_candidates() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/w/index.php"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (resolver, _) = resolver(&server, true);
    let candidates = resolver.resolve(&robin(), 3, &HashSet::new()).await;

    assert!(candidates.is_empty());
}

#[tokio::test]
async fn test_resolve_unavailable_file_page_drops_only_that_candidate() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let host = server.uri();
    mount_search(
        &server,
        PRIMARY_QUERY,
        search_page(&host, &["Gone.jpg", "Robin1.jpg"]),
    )
    .await;
    mount_search(&server, FALLBACK_QUERY, search_page(&host, &["Gone.jpg"])).await;
    Mock::given(method("GET"))
        .and(path("/wiki/File:Gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_detail(&server, "Robin1.jpg", detail_page("Jane Doe", "American robin", 2400, 1600)).await;

    let (resolver, _) = resolver(&server, true);
    let candidates = resolver.resolve(&robin(), 2, &HashSet::new()).await;

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].attribution, "© Jane Doe");
}
