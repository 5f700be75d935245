//! Integration tests for the build pass.
//!
//! Exercise the builder against a mock image host with a scripted resolver,
//! and once end to end with the media search resolver.

use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use birdcache_core::builder::{BuildSettings, CacheBuilder, SpeciesOutcome};
use birdcache_core::cache::CacheStore;
use birdcache_core::catalog::SpeciesEntry;
use birdcache_core::resolver::{
    ImageCandidate, ImageResolver, ResolverSettings, WikimediaResolver,
};
use birdcache_core::transport::{RateLimitedTransport, RateLimiter, RetryPolicy};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::pages::{jpeg_bytes, search_page, sized_path};
use support::socket_guard::start_mock_server_or_skip;

/// Serves a fixed pool of candidates, honoring `count` and `excluded`.
struct PoolResolver {
    pool: Vec<ImageCandidate>,
    calls: Mutex<Vec<(String, usize, HashSet<String>)>>,
}

impl PoolResolver {
    fn new(urls: &[String]) -> Self {
        Self {
            pool: urls
                .iter()
                .map(|url| ImageCandidate {
                    source_url: url.clone(),
                    attribution: "© Jane Doe".to_string(),
                })
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, usize, HashSet<String>)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ImageResolver for PoolResolver {
    async fn resolve(
        &self,
        species: &SpeciesEntry,
        count: usize,
        excluded: &HashSet<String>,
    ) -> Vec<ImageCandidate> {
        self.calls.lock().expect("calls lock").push((
            species.common_name.clone(),
            count,
            excluded.clone(),
        ));
        self.pool
            .iter()
            .filter(|candidate| !excluded.contains(&candidate.source_url))
            .take(count)
            .cloned()
            .collect()
    }
}

fn transport() -> Arc<RateLimitedTransport> {
    Arc::new(
        RateLimitedTransport::new(RetryPolicy::with_max_attempts(1), RateLimiter::disabled())
            .expect("transport"),
    )
}

fn settings(images_per_species: usize) -> BuildSettings {
    BuildSettings {
        images_per_species,
        ..BuildSettings::default()
    }
}

async fn mount_images(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/img/.+\.jpg$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg_bytes(32, 24)))
        .mount(server)
        .await;
}

fn image_urls(server: &MockServer, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| format!("{}/img/{name}.jpg", server.uri()))
        .collect()
}

fn robin() -> SpeciesEntry {
    SpeciesEntry::new("American Robin", "Turdus migratorius")
}

#[tokio::test]
async fn test_american_robin_first_build() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_images(&server).await;
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(CacheStore::open(dir.path()).expect("store"));
    let urls = image_urls(&server, &["robin-a", "robin-b"]);
    let resolver = Arc::new(PoolResolver::new(&urls));

    let builder = CacheBuilder::new(
        store,
        Arc::clone(&resolver) as Arc<dyn ImageResolver>,
        transport(),
        settings(3),
    )
    .expect("builder");
    let report = builder.build(&[robin()]).await.expect("build");

    assert_eq!(report.attempted, 1);
    assert_eq!(report.already_complete, 0);
    assert_eq!(report.images_saved, 2);
    assert_eq!(report.outcomes["American Robin"], SpeciesOutcome::Done { saved: 2 });

    let calls = resolver.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, 3);
    assert!(calls[0].2.is_empty());

    let species_dir = dir.path().join("American_Robin");
    for (index, url) in urls.iter().enumerate() {
        let stem = format!("American_Robin_{}", index + 1);
        assert!(species_dir.join(format!("{stem}.jpg")).is_file());
        let sidecar = fs::read_to_string(species_dir.join(format!("{stem}.txt"))).expect("sidecar");
        assert!(sidecar.contains(url.as_str()));
        assert!(sidecar.contains("© Jane Doe"));
    }
    assert!(!species_dir.join("American_Robin_3.jpg").exists());
}

#[tokio::test]
async fn test_rebuild_of_complete_cache_uses_no_network() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_images(&server).await;
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(CacheStore::open(dir.path()).expect("store"));
    let urls = image_urls(&server, &["robin-a", "robin-b"]);

    let first = CacheBuilder::new(
        Arc::clone(&store),
        Arc::new(PoolResolver::new(&urls)),
        transport(),
        settings(2),
    )
    .expect("builder");
    first.build(&[robin()]).await.expect("first build");
    let before: Vec<_> = fs::read_dir(dir.path().join("American_Robin"))
        .expect("species dir")
        .map(|entry| entry.expect("entry").path())
        .collect();

    let resolver = Arc::new(PoolResolver::new(&urls));
    let second_transport = transport();
    let second = CacheBuilder::new(
        store,
        Arc::clone(&resolver) as Arc<dyn ImageResolver>,
        Arc::clone(&second_transport),
        settings(2),
    )
    .expect("builder");
    let report = second.build(&[robin()]).await.expect("second build");

    assert_eq!(report.already_complete, 1);
    assert_eq!(report.attempted, 0);
    assert_eq!(
        report.outcomes["American Robin"],
        SpeciesOutcome::AlreadyComplete { existing: 2 }
    );
    assert!(resolver.calls().is_empty());
    assert_eq!(second_transport.requests_issued(), 0);

    let after: Vec<_> = fs::read_dir(dir.path().join("American_Robin"))
        .expect("species dir")
        .map(|entry| entry.expect("entry").path())
        .collect();
    assert_eq!(before.len(), after.len());
}

#[tokio::test]
async fn test_topping_up_skips_known_urls_and_next_index() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_images(&server).await;
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(CacheStore::open(dir.path()).expect("store"));
    let urls = image_urls(&server, &["robin-a", "robin-b", "robin-c"]);

    let first = CacheBuilder::new(
        Arc::clone(&store),
        Arc::new(PoolResolver::new(&urls[..2])),
        transport(),
        settings(3),
    )
    .expect("builder");
    first.build(&[robin()]).await.expect("first build");

    let resolver = Arc::new(PoolResolver::new(&urls));
    let second = CacheBuilder::new(
        store,
        Arc::clone(&resolver) as Arc<dyn ImageResolver>,
        transport(),
        settings(3),
    )
    .expect("builder");
    let report = second.build(&[robin()]).await.expect("second build");

    assert_eq!(report.outcomes["American Robin"], SpeciesOutcome::Done { saved: 1 });
    let calls = resolver.calls();
    assert_eq!(calls[0].1, 1);
    assert!(calls[0].2.contains(&urls[0]));
    assert!(calls[0].2.contains(&urls[1]));

    let sidecar = fs::read_to_string(dir.path().join("American_Robin/American_Robin_3.txt"))
        .expect("third sidecar");
    assert!(sidecar.contains(urls[2].as_str()));
}

#[tokio::test]
async fn test_new_images_are_numbered_after_existing_count() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_images(&server).await;
    let dir = TempDir::new().expect("temp dir");
    let species_dir = dir.path().join("American_Robin");
    fs::create_dir_all(&species_dir).expect("species dir");
    for n in [1, 3] {
        fs::write(species_dir.join(format!("American_Robin_{n}.jpg")), jpeg_bytes(8, 8))
            .expect("image");
        fs::write(
            species_dir.join(format!("American_Robin_{n}.txt")),
            format!("URL: https://example.org/robin-{n}.jpg\nAttribution: © Ann\n"),
        )
        .expect("sidecar");
    }
    let store = Arc::new(CacheStore::open(dir.path()).expect("store"));
    let urls = image_urls(&server, &["robin-new"]);

    let builder = CacheBuilder::new(
        store,
        Arc::new(PoolResolver::new(&urls)),
        transport(),
        settings(3),
    )
    .expect("builder");
    let report = builder.build(&[robin()]).await.expect("build");

    assert_eq!(report.outcomes["American Robin"], SpeciesOutcome::Done { saved: 1 });
    assert!(!species_dir.join("American_Robin_2.jpg").exists());
    let sidecar = fs::read_to_string(species_dir.join("American_Robin_4.txt")).expect("fourth sidecar");
    assert!(sidecar.contains(urls[0].as_str()));
}

#[tokio::test]
async fn test_failed_species_does_not_stop_others() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_images(&server).await;
    Mock::given(method("GET"))
        .and(path("/broken/owl.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    struct SplitResolver {
        host: String,
    }

    #[async_trait]
    impl ImageResolver for SplitResolver {
        async fn resolve(
            &self,
            species: &SpeciesEntry,
            _count: usize,
            _excluded: &HashSet<String>,
        ) -> Vec<ImageCandidate> {
            let path = if species.common_name == "Snowy Owl" {
                "/broken/owl.jpg"
            } else {
                "/img/robin-a.jpg"
            };
            vec![ImageCandidate {
                source_url: format!("{}{path}", self.host),
                attribution: "© Wikimedia Commons".to_string(),
            }]
        }
    }

    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(CacheStore::open(dir.path()).expect("store"));
    let builder = CacheBuilder::new(
        store,
        Arc::new(SplitResolver { host: server.uri() }),
        transport(),
        settings(1),
    )
    .expect("builder");
    let report = builder
        .build(&[robin(), SpeciesEntry::new("Snowy Owl", "Bubo scandiacus")])
        .await
        .expect("build");

    assert_eq!(report.done, 1);
    assert_eq!(report.failed, 1);
    assert!(report.is_partial());
    assert_eq!(report.failed_species(), vec!["Snowy Owl"]);
    assert!(!dir.path().join("Snowy_Owl").join("Snowy_Owl_1.jpg").exists());
}

#[tokio::test]
async fn test_non_image_body_is_not_cached() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/img/error-page.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Error</html>"))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(CacheStore::open(dir.path()).expect("store"));
    let builder = CacheBuilder::new(
        store,
        Arc::new(PoolResolver::new(&image_urls(&server, &["error-page"]))),
        transport(),
        settings(1),
    )
    .expect("builder");
    let report = builder.build(&[robin()]).await.expect("build");

    assert_eq!(report.failed, 1);
    let species_dir = dir.path().join("American_Robin");
    let leftovers = fs::read_dir(&species_dir).map(Iterator::count).unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_repeated_species_rows_build_once() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_images(&server).await;
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(CacheStore::open(dir.path()).expect("store"));
    let urls = image_urls(&server, &["robin-a", "robin-b", "robin-c"]);
    let resolver = Arc::new(PoolResolver::new(&urls));
    let transport = transport();

    let builder = CacheBuilder::new(
        store,
        Arc::clone(&resolver) as Arc<dyn ImageResolver>,
        Arc::clone(&transport),
        BuildSettings {
            workers: 2,
            ..settings(3)
        },
    )
    .expect("builder");
    let report = builder.build(&[robin(), robin()]).await.expect("build");

    assert_eq!(report.attempted, 1);
    assert_eq!(report.done, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.images_saved, 3);
    assert_eq!(report.outcomes.len(), 1);
    assert!(report.is_success());
    assert_eq!(resolver.calls().len(), 1);
    assert_eq!(transport.requests_issued(), 3);
}

/// Records how many resolutions overlap; resolves to nothing.
#[derive(Default)]
struct OverlapResolver {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl ImageResolver for OverlapResolver {
    async fn resolve(
        &self,
        _species: &SpeciesEntry,
        _count: usize,
        _excluded: &HashSet<String>,
    ) -> Vec<ImageCandidate> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Vec::new()
    }
}

#[tokio::test]
async fn test_species_tasks_are_bounded_by_workers() {
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(CacheStore::open(dir.path()).expect("store"));
    let resolver = Arc::new(OverlapResolver::default());
    let builder = CacheBuilder::new(
        store,
        Arc::clone(&resolver) as Arc<dyn ImageResolver>,
        transport(),
        BuildSettings {
            workers: 2,
            ..settings(1)
        },
    )
    .expect("builder");

    let catalog: Vec<_> = (1..=6)
        .map(|n| SpeciesEntry::new(format!("Warbler {n}"), "Setophaga sp."))
        .collect();
    let report = builder.build(&catalog).await.expect("build");

    assert_eq!(report.failed, 6);
    assert_eq!(resolver.peak.load(Ordering::SeqCst), 2);
    assert_eq!(resolver.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_build_end_to_end_with_media_search() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let host = server.uri();
    Mock::given(method("GET"))
        .and(path("/w/index.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(search_page(&host, &["Robin1.jpg", "Robin2.jpg"])),
        )
        .mount(&server)
        .await;
    for name in ["Robin1.jpg", "Robin2.jpg"] {
        Mock::given(method("GET"))
            .and(path(sized_path(name, 1280)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg_bytes(64, 48)))
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(CacheStore::open(dir.path()).expect("store"));
    let transport = transport();
    let resolver = WikimediaResolver::new(
        Arc::clone(&transport),
        ResolverSettings {
            search_base_url: host.clone(),
            quality_checks: false,
            ..ResolverSettings::default()
        },
    )
    .expect("resolver");
    let builder =
        CacheBuilder::new(store, Arc::new(resolver), transport, settings(2)).expect("builder");

    let report = builder.build(&[robin()]).await.expect("build");

    assert_eq!(report.images_saved, 2);
    assert!(report.is_success());
    let sidecar = fs::read_to_string(dir.path().join("American_Robin/American_Robin_1.txt"))
        .expect("sidecar");
    assert!(sidecar.contains(&format!("URL: {host}{}", sized_path("Robin1.jpg", 1280))));
    assert!(sidecar.contains("Attribution: © Wikimedia Commons"));
}
