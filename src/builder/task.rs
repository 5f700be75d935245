//! One species task: completeness check, resolution, download, persistence.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::report::SpeciesOutcome;
use crate::cache::{CacheStore, SaveOutcome};
use crate::catalog::{SpeciesEntry, SpeciesId};
use crate::resolver::{ImageCandidate, ImageResolver};
use crate::transport::RateLimitedTransport;

/// Lifecycle of a species task.
///
/// `Pending → AlreadyComplete`, or
/// `Pending → Fetching → Resolving → Downloading → Done | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not started.
    Pending,
    /// Target already met on disk; no network use.
    AlreadyComplete,
    /// Reading cache state needed for resolution.
    Fetching,
    /// Waiting on the resolver.
    Resolving,
    /// Downloading and saving candidates.
    Downloading,
    /// At least one image saved.
    Done,
    /// Nothing saved.
    Failed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::AlreadyComplete => "already-complete",
            Self::Fetching => "fetching",
            Self::Resolving => "resolving",
            Self::Downloading => "downloading",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Shared, read-only inputs for every species task.
#[derive(Clone)]
pub(crate) struct TaskContext {
    pub(crate) store: Arc<CacheStore>,
    pub(crate) resolver: Arc<dyn ImageResolver>,
    pub(crate) transport: Arc<RateLimitedTransport>,
    pub(crate) target: usize,
    pub(crate) image_timeout: Duration,
}

struct Transitions<'a> {
    species: &'a str,
    state: TaskState,
}

impl Transitions<'_> {
    fn advance(&mut self, next: TaskState) {
        debug!(species = self.species, from = %self.state, to = %next, "task transition");
        self.state = next;
    }
}

/// Runs one species to completion. Never fails outward.
pub(crate) async fn run_species_task(ctx: &TaskContext, species: &SpeciesEntry) -> SpeciesOutcome {
    let id = species.folder_id();
    let mut task = Transitions {
        species: &species.common_name,
        state: TaskState::Pending,
    };

    let existing = ctx.store.existing_count(&id);
    if existing >= ctx.target {
        task.advance(TaskState::AlreadyComplete);
        return SpeciesOutcome::AlreadyComplete { existing };
    }

    task.advance(TaskState::Fetching);
    let removed = ctx.store.remove_partial_files(&id);
    if removed > 0 {
        debug!(species = %species.common_name, removed, "removed partial files");
    }
    let known = ctx.store.known_urls(&id);

    task.advance(TaskState::Resolving);
    let wanted = ctx.target - existing;
    let candidates = ctx.resolver.resolve(species, wanted, &known).await;
    if candidates.is_empty() {
        task.advance(TaskState::Failed);
        return SpeciesOutcome::Failed {
            reason: "no image candidates found".to_string(),
        };
    }

    task.advance(TaskState::Downloading);
    let mut saved = 0;
    let mut next_index = existing + 1;
    for candidate in candidates.iter().take(wanted) {
        if known.contains(&candidate.source_url) {
            debug!(url = %candidate.source_url, "resolver offered a known URL, skipping");
            continue;
        }
        let index = ctx.store.next_free_index(&id, next_index);
        next_index = index + 1;
        if download_and_save(ctx, &id, index, candidate).await {
            saved += 1;
        }
    }

    if saved == 0 {
        task.advance(TaskState::Failed);
        SpeciesOutcome::Failed {
            reason: format!("none of {} candidate(s) could be saved", candidates.len()),
        }
    } else {
        task.advance(TaskState::Done);
        SpeciesOutcome::Done { saved }
    }
}

async fn download_and_save(
    ctx: &TaskContext,
    id: &SpeciesId,
    index: usize,
    candidate: &ImageCandidate,
) -> bool {
    let paths = ctx.store.image_paths(id, index, &candidate.source_url);
    if ctx.store.is_saved(&paths) {
        debug!(path = %paths.image.display(), "pair already on disk, no download");
        return false;
    }

    let response = match ctx
        .transport
        .get(&candidate.source_url, ctx.image_timeout)
        .await
    {
        Ok(response) => response,
        Err(error) => {
            warn!(species = %id, url = %candidate.source_url, error = %error, "image download failed");
            return false;
        }
    };

    if let Err(error) = image::guess_format(&response.body) {
        warn!(species = %id, url = %candidate.source_url, error = %error, "downloaded body is not an image");
        return false;
    }

    match ctx.store.save(id, index, candidate, &response.body) {
        Ok(SaveOutcome::Written) => true,
        Ok(SaveOutcome::AlreadyPresent) => false,
        Err(error) => {
            warn!(species = %id, url = %candidate.source_url, error = %error, "could not persist image");
            false
        }
    }
}
