//! `build` command: fill the cache for every species in the list.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use birdcache_core::builder::{BuildSettings, CacheBuilder};
use birdcache_core::cache::CacheStore;
use birdcache_core::catalog::{SpeciesEntry, load_species};
use birdcache_core::resolver::{ContentPolicy, ResolverSettings, WikimediaResolver};
use birdcache_core::transport::constants::{IMAGE_TIMEOUT, PROBE_TIMEOUT};
use birdcache_core::transport::{RateLimitedTransport, RateLimiter, RetryPolicy};
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::exit_handler::determine_exit_outcome;
use crate::cli::BuildArgs;
use crate::commands::resize::resize_cache;

fn any_incomplete(store: &CacheStore, catalog: &[SpeciesEntry], target: usize) -> bool {
    catalog
        .iter()
        .any(|species| !store.is_complete(&species.folder_id(), target))
}

pub async fn run_build_command(args: &BuildArgs, show_progress: bool) -> Result<ProcessExit> {
    let catalog = load_species(&args.species_file);
    if catalog.is_empty() {
        warn!(path = %args.species_file.display(), "no species to process");
        return Ok(ProcessExit::Failure);
    }

    let store = Arc::new(CacheStore::open(&args.cache_dir).with_context(|| {
        format!("Failed to open cache directory '{}'", args.cache_dir.display())
    })?);

    let limiter = if args.rate_limit == 0 {
        debug!("rate limiting disabled");
        RateLimiter::disabled()
    } else {
        debug!(rate_limit_ms = args.rate_limit, "rate limiting enabled");
        RateLimiter::new(Duration::from_millis(args.rate_limit))
    };
    let transport = Arc::new(
        RateLimitedTransport::new(
            RetryPolicy::with_max_attempts(u32::from(args.max_retries)),
            limiter,
        )
        .context("Failed to build HTTP client")?,
    );

    let target = usize::from(args.images_per_species);
    if !any_incomplete(&store, &catalog, target) {
        debug!("every species already complete, skipping reachability probe");
    } else if !transport.is_reachable(&args.search_url, PROBE_TIMEOUT).await {
        warn!(url = %args.search_url, "media search host is not reachable; species will likely fail");
    }

    let resolver = Arc::new(
        WikimediaResolver::new(
            Arc::clone(&transport),
            ResolverSettings {
                search_base_url: args.search_url.clone(),
                quality_checks: !args.no_quality_checks,
                target_width: args.target_width,
                min_width: args.min_width,
                policy: ContentPolicy::default(),
                ..ResolverSettings::default()
            },
        )
        .context("Invalid search URL")?,
    );

    let builder = CacheBuilder::new(
        store,
        resolver,
        transport,
        BuildSettings {
            images_per_species: target,
            workers: usize::from(args.workers),
            image_timeout: IMAGE_TIMEOUT,
            show_progress,
        },
    )?;
    let report = builder.build(&catalog).await?;

    info!(
        species = report.total(),
        attempted = report.attempted,
        already_complete = report.already_complete,
        failed = report.failed,
        images_saved = report.images_saved,
        "Build complete"
    );
    for name in report.failed_species() {
        warn!(species = name, "no images cached");
    }

    let mut exit = determine_exit_outcome(report.done + report.already_complete, report.failed);

    if args.resize {
        let counts = resize_cache(&args.cache_dir, &args.resize_box, show_progress).await?;
        if counts.errored > 0 && exit == ProcessExit::Success {
            exit = ProcessExit::Partial;
        }
    }

    Ok(exit)
}
