//! Resize pass: brings oversized cached images down to the display box.
//!
//! Every image file under the cache root is inspected. Dimensions come from
//! the header, so files that need no work are never decoded or rewritten.
//! Oversized files are resampled with Lanczos3 to [`fill_dimensions`] and
//! replaced via a temp file and rename, keeping their encoded format.
//!
//! Decoding runs on the blocking pool, bounded by a semaphore.

mod error;
mod geometry;

use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

pub use error::{DecodeError, ResizeError};
pub use geometry::fill_dimensions;

use crate::cache::is_image_file;
use crate::progress::ProgressTracker;

/// Default bounding box width.
pub const DEFAULT_MAX_WIDTH: u32 = 800;

/// Default bounding box height.
pub const DEFAULT_MAX_HEIGHT: u32 = 600;

const TEMP_SUFFIX: &str = ".resizing";

/// Resize pass settings.
#[derive(Debug, Clone)]
pub struct ResizeSettings {
    /// Bounding box width.
    pub max_width: u32,
    /// Bounding box height.
    pub max_height: u32,
    /// Concurrent decode jobs.
    pub workers: usize,
    /// Draw a progress bar instead of log lines.
    pub show_progress: bool,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            workers: default_workers(),
            show_progress: false,
        }
    }
}

/// Logical CPU count, or 1 when it cannot be determined.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Tallies for one resize pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeCounts {
    /// Files rewritten at new dimensions.
    pub resized: usize,
    /// Files left untouched.
    pub skipped: usize,
    /// Files that could not be decoded or written.
    pub errored: usize,
}

impl ResizeCounts {
    /// Files inspected.
    #[must_use]
    pub fn total(&self) -> usize {
        self.resized + self.skipped + self.errored
    }

    fn record(&mut self, result: &Result<FileOutcome, DecodeError>) {
        match result {
            Ok(FileOutcome::Resized { .. }) => self.resized += 1,
            Ok(FileOutcome::Skipped { .. }) => self.skipped += 1,
            Err(_) => self.errored += 1,
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Rewritten at `to`.
    Resized {
        /// Original dimensions.
        from: (u32, u32),
        /// New dimensions.
        to: (u32, u32),
    },
    /// Already within bounds, or unchanged after rounding.
    Skipped {
        /// Current dimensions.
        size: (u32, u32),
    },
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resized { from, to } => {
                write!(f, "resized {}x{} -> {}x{}", from.0, from.1, to.0, to.1)
            }
            Self::Skipped { size } => write!(f, "skipped ({}x{})", size.0, size.1),
        }
    }
}

/// Applies the fill policy to one file in place.
///
/// # Errors
///
/// Returns [`DecodeError`] if the file cannot be decoded, encoded, or replaced.
/// The original file is left intact in every error case.
pub fn resize_file(path: &Path, max_width: u32, max_height: u32) -> Result<FileOutcome, DecodeError> {
    let (width, height) = open_guessed(path)?
        .into_dimensions()
        .map_err(|e| DecodeError::decode(path, e))?;

    let Some((new_width, new_height)) = fill_dimensions(width, height, max_width, max_height)
    else {
        return Ok(FileOutcome::Skipped {
            size: (width, height),
        });
    };

    let reader = open_guessed(path)?;
    let format = reader.format().unwrap_or(ImageFormat::Jpeg);
    let decoded = reader.decode().map_err(|e| DecodeError::decode(path, e))?;
    let resized = decoded.resize_exact(new_width, new_height, FilterType::Lanczos3);
    let output = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(resized.to_rgb8())
    } else {
        resized
    };

    let temp = temp_path(path);
    if let Err(source) = output.save_with_format(&temp, format) {
        let _ = fs::remove_file(&temp);
        return Err(DecodeError::Encode {
            path: path.to_path_buf(),
            source,
        });
    }
    if let Err(source) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(DecodeError::Replace {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(FileOutcome::Resized {
        from: (width, height),
        to: (new_width, new_height),
    })
}

/// Opens `path` and sniffs its format from content rather than extension.
fn open_guessed(path: &Path) -> Result<ImageReader<std::io::BufReader<fs::File>>, DecodeError> {
    ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|e| DecodeError::decode(path, image::ImageError::IoError(e)))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Image files under `root`, in a stable order.
#[must_use]
pub fn collect_image_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_image_file(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Runs the resize pass over a cache root.
#[derive(Debug)]
pub struct Resizer {
    settings: ResizeSettings,
    semaphore: Arc<Semaphore>,
}

impl Resizer {
    /// Creates a resizer.
    ///
    /// # Errors
    ///
    /// Returns [`ResizeError::InvalidWorkers`] if `workers` is 0.
    pub fn new(settings: ResizeSettings) -> Result<Self, ResizeError> {
        if settings.workers == 0 {
            return Err(ResizeError::InvalidWorkers);
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(settings.workers)),
            settings,
        })
    }

    /// Inspects every image file under `root` and resizes the oversized ones.
    ///
    /// Per-file failures are counted in [`ResizeCounts::errored`]; the walk
    /// always continues.
    ///
    /// # Errors
    ///
    /// - [`ResizeError::RootMissing`] if `root` is not a directory
    /// - [`ResizeError::SemaphoreClosed`] if the worker semaphore is closed
    #[instrument(skip(self, root), fields(root = %root.display(), workers = self.settings.workers))]
    pub async fn resize_all(&self, root: &Path) -> Result<ResizeCounts, ResizeError> {
        if !root.is_dir() {
            return Err(ResizeError::RootMissing {
                path: root.to_path_buf(),
            });
        }

        let files = collect_image_files(root);
        let progress = Arc::new(ProgressTracker::new(
            files.len(),
            self.settings.show_progress,
            "resize",
        ));
        info!(
            files = files.len(),
            max_width = self.settings.max_width,
            max_height = self.settings.max_height,
            "starting resize pass"
        );

        let (max_width, max_height) = (self.settings.max_width, self.settings.max_height);
        let counts = self
            .run_jobs(files, &progress, move |path| resize_file(path, max_width, max_height))
            .await?;
        progress.finish();

        debug!(?counts, "resize tallies");
        info!(
            resized = counts.resized,
            skipped = counts.skipped,
            errored = counts.errored,
            "resize pass complete"
        );
        Ok(counts)
    }

    /// Runs `job` once per file on the blocking pool, at most `workers` at a
    /// time, and tallies the outcomes.
    async fn run_jobs<F>(
        &self,
        files: Vec<PathBuf>,
        progress: &Arc<ProgressTracker>,
        job: F,
    ) -> Result<ResizeCounts, ResizeError>
    where
        F: Fn(&Path) -> Result<FileOutcome, DecodeError> + Send + Sync + 'static,
    {
        let job = Arc::new(job);
        let mut handles = Vec::with_capacity(files.len());
        for path in files {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| ResizeError::SemaphoreClosed)?;

            let progress = Arc::clone(progress);
            let job = Arc::clone(&job);
            let display = path.display().to_string();

            handles.push((
                display,
                tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    let result = job(&path);
                    match &result {
                        Ok(outcome) => progress.record(&format!("{}: {outcome}", path.display())),
                        Err(error) => progress.record(&format!("{}: error ({error})", path.display())),
                    };
                    result
                }),
            ));
        }

        let mut counts = ResizeCounts::default();
        for (path, handle) in handles {
            match handle.await {
                Ok(result) => {
                    if let Err(error) = &result {
                        warn!(path, error = %error, "could not resize image");
                    }
                    counts.record(&result);
                }
                Err(error) => {
                    warn!(path, error = %error, "resize job panicked");
                    progress.record(&format!("{path}: error (job panicked)"));
                    counts.errored += 1;
                }
            }
        }
        Ok(counts)
    }
}
