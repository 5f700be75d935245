//! `refresh` command: replace the species list from a listing service.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use birdcache_core::refresh::{HttpSpeciesProvider, SpeciesProvider, apply_refresh, plan_refresh};
use birdcache_core::transport::{RateLimitedTransport, RateLimiter, RetryPolicy};
use tracing::{info, warn};

use crate::ProcessExit;
use crate::app::terminal;
use crate::cli::RefreshArgs;

pub async fn run_refresh_command(args: &RefreshArgs) -> Result<ProcessExit> {
    let transport = Arc::new(
        RateLimitedTransport::new(RetryPolicy::default(), RateLimiter::disabled())
            .context("Failed to build HTTP client")?,
    );
    let provider = HttpSpeciesProvider::new(transport, args.api_url.clone());
    let listing = provider.fetch().await?;

    info!(
        latitude = listing.latitude,
        longitude = listing.longitude,
        species = listing.species.len(),
        "Listing received"
    );

    let plan = plan_refresh(&listing, args.species_file.exists());
    for warning in &plan.warnings {
        warn!("{warning}");
    }

    if plan.needs_confirmation && !args.yes {
        let prompt = format!(
            "Write {} species to '{}'?",
            listing.species.len(),
            args.species_file.display()
        );
        if !terminal::confirm(&prompt, &mut io::stdin().lock())? {
            info!("Refresh cancelled; species file unchanged");
            return Ok(ProcessExit::Success);
        }
    }

    apply_refresh(&args.species_file, &listing)?;
    Ok(ProcessExit::Success)
}
