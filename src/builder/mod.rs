//! Build pass: fans species tasks out over a bounded worker pool.
//!
//! # Concurrency Model
//!
//! - Each species runs in its own Tokio task
//! - A semaphore permit is acquired before spawning, so at most `workers`
//!   tasks run at once (deliberately small to respect the shared rate limiter)
//! - Tasks share only the transport's rate limiter and the progress tracker
//! - A failing or panicking task is recorded; the pass always completes

mod report;
mod task;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

pub use report::{BuildReport, SpeciesOutcome};
pub use task::TaskState;

use crate::cache::CacheStore;
use crate::catalog::SpeciesEntry;
use crate::progress::ProgressTracker;
use crate::resolver::ImageResolver;
use crate::transport::RateLimitedTransport;
use crate::transport::constants::IMAGE_TIMEOUT;
use task::{TaskContext, run_species_task};

/// Minimum allowed worker count.
pub const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
pub const MAX_WORKERS: usize = 16;

/// Default worker count.
pub const DEFAULT_WORKERS: usize = 3;

/// Default images per species.
pub const DEFAULT_IMAGES_PER_SPECIES: usize = 3;

/// Error type for build configuration and scheduling.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Worker count outside the accepted range.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkers {
        /// The rejected value.
        value: usize,
    },

    /// Target of zero images per species.
    #[error("images per species must be at least 1")]
    InvalidTarget,

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Build pass settings.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Target image count per species.
    pub images_per_species: usize,
    /// Concurrent species tasks.
    pub workers: usize,
    /// Timeout for each image download.
    pub image_timeout: Duration,
    /// Draw a progress bar instead of log lines.
    pub show_progress: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            images_per_species: DEFAULT_IMAGES_PER_SPECIES,
            workers: DEFAULT_WORKERS,
            image_timeout: IMAGE_TIMEOUT,
            show_progress: false,
        }
    }
}

/// Orchestrates one build pass over a species catalog.
pub struct CacheBuilder {
    context: TaskContext,
    semaphore: Arc<Semaphore>,
    settings: BuildSettings,
}

impl std::fmt::Debug for CacheBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("root", &self.context.store.root())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CacheBuilder {
    /// Creates a builder.
    ///
    /// # Errors
    ///
    /// - [`BuildError::InvalidWorkers`] if `workers` is outside 1..=16
    /// - [`BuildError::InvalidTarget`] if `images_per_species` is 0
    #[instrument(level = "debug", skip(store, resolver, transport))]
    pub fn new(
        store: Arc<CacheStore>,
        resolver: Arc<dyn ImageResolver>,
        transport: Arc<RateLimitedTransport>,
        settings: BuildSettings,
    ) -> Result<Self, BuildError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&settings.workers) {
            return Err(BuildError::InvalidWorkers {
                value: settings.workers,
            });
        }
        if settings.images_per_species == 0 {
            return Err(BuildError::InvalidTarget);
        }

        Ok(Self {
            context: TaskContext {
                store,
                resolver,
                transport,
                target: settings.images_per_species,
                image_timeout: settings.image_timeout,
            },
            semaphore: Arc::new(Semaphore::new(settings.workers)),
            settings,
        })
    }

    /// Runs one task per species and returns the aggregate report.
    ///
    /// Individual species failures do not cause this method to error.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::SemaphoreClosed`] if the worker semaphore is closed.
    #[instrument(skip(self, catalog), fields(species = catalog.len(), workers = self.settings.workers))]
    pub async fn build(&self, catalog: &[SpeciesEntry]) -> Result<BuildReport, BuildError> {
        let species_list = unique_by_common_name(catalog);
        let progress = Arc::new(ProgressTracker::new(
            species_list.len(),
            self.settings.show_progress,
            "build",
        ));
        let mut handles = Vec::with_capacity(species_list.len());

        info!(target = self.context.target, "starting build pass");

        for species in species_list {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| BuildError::SemaphoreClosed)?;

            let context = self.context.clone();
            let progress = Arc::clone(&progress);
            let species = species.clone();
            let name = species.common_name.clone();

            handles.push((
                name,
                tokio::spawn(async move {
                    let _permit = permit;
                    let outcome = run_species_task(&context, &species).await;
                    progress.record(&format!("{}: {outcome}", species.common_name));
                    outcome
                }),
            ));
        }

        debug!(task_count = handles.len(), "waiting for species tasks");

        let mut report = BuildReport::default();
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(species = %name, error = %error, "species task panicked");
                    progress.record(&format!("{name}: failed (task panicked)"));
                    SpeciesOutcome::Failed {
                        reason: format!("task panicked: {error}"),
                    }
                }
            };
            if let SpeciesOutcome::Failed { reason } = &outcome {
                warn!(species = %name, reason, "species failed");
            }
            report.record(name, outcome);
        }
        progress.finish();

        info!(
            attempted = report.attempted,
            already_complete = report.already_complete,
            done = report.done,
            failed = report.failed,
            images_saved = report.images_saved,
            requests = self.context.transport.requests_issued(),
            "build pass complete"
        );
        Ok(report)
    }
}

/// First entry per common name, in catalog order.
///
/// Outcomes are keyed by common name, and two tasks for one name would race
/// on the same folder.
fn unique_by_common_name(catalog: &[SpeciesEntry]) -> Vec<&SpeciesEntry> {
    let mut seen = HashSet::new();
    catalog
        .iter()
        .filter(|entry| {
            let first = seen.insert(entry.common_name.as_str());
            if !first {
                warn!(species = %entry.common_name, "skipping repeated species entry");
            }
            first
        })
        .collect()
}
