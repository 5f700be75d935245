//! `resize` command: bring cached images down to the display box.

use std::path::Path;

use anyhow::{Context, Result};
use birdcache_core::resize::{ResizeCounts, ResizeSettings, Resizer, default_workers};
use tracing::info;

use crate::ProcessExit;
use crate::app::exit_handler::determine_exit_outcome;
use crate::cli::{ResizeArgs, ResizeBoxArgs};

pub async fn run_resize_command(args: &ResizeArgs, show_progress: bool) -> Result<ProcessExit> {
    let counts = resize_cache(&args.cache_dir, &args.resize_box, show_progress).await?;
    Ok(determine_exit_outcome(
        counts.resized + counts.skipped,
        counts.errored,
    ))
}

pub(crate) async fn resize_cache(
    cache_dir: &Path,
    resize_box: &ResizeBoxArgs,
    show_progress: bool,
) -> Result<ResizeCounts> {
    let resizer = Resizer::new(ResizeSettings {
        max_width: resize_box.max_width,
        max_height: resize_box.max_height,
        workers: resize_box
            .resize_workers
            .map_or_else(default_workers, usize::from),
        show_progress,
    })?;
    let counts = resizer
        .resize_all(cache_dir)
        .await
        .with_context(|| format!("Failed to resize images in '{}'", cache_dir.display()))?;

    info!(
        resized = counts.resized,
        skipped = counts.skipped,
        errored = counts.errored,
        "Resize complete"
    );
    Ok(counts)
}
