//! Completion counter and output line shared by the build and resize pools.
//!
//! One lock guards both the counter and the print, so lines from concurrent
//! workers never interleave and numbering is gap-free. The lock is held only
//! for the increment and the print.

use std::sync::{Mutex, PoisonError};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Progress reporter for a fixed number of units.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    completed: Mutex<usize>,
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Creates a tracker; with `show_bar` an indicatif bar is drawn on stderr,
    /// otherwise each record is a log line.
    #[must_use]
    pub fn new(total: usize, show_bar: bool, label: &str) -> Self {
        let bar = show_bar.then(|| {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} {wide_msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar.set_prefix(label.to_string());
            bar
        });
        Self {
            total,
            completed: Mutex::new(0),
            bar,
        }
    }

    /// Counts one finished unit and prints `line` for it. Returns the new count.
    pub fn record(&self, line: &str) -> usize {
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        *completed += 1;
        let done = *completed;
        match &self.bar {
            Some(bar) => {
                bar.println(format!("[{done}/{}] {line}", self.total));
                bar.set_position(done as u64);
            }
            None => info!(done, total = self.total, "{line}"),
        }
        done
    }

    /// Units finished so far.
    #[must_use]
    pub fn completed(&self) -> usize {
        *self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total units expected.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Clears the bar, if any.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
