//! Per-species outcomes and aggregate tallies for a build pass.

use std::collections::BTreeMap;
use std::fmt;

/// Final state of one species task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeciesOutcome {
    /// Already at target before any network use.
    AlreadyComplete {
        /// Images found on disk.
        existing: usize,
    },
    /// At least one new image was saved.
    Done {
        /// New images saved by this run.
        saved: usize,
    },
    /// Nothing was saved.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

impl fmt::Display for SpeciesOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyComplete { existing } => write!(f, "already complete ({existing} images)"),
            Self::Done { saved } => write!(f, "done ({saved} new)"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Aggregate result of [`CacheBuilder::build`](super::CacheBuilder::build).
///
/// `attempted` counts species that needed network work; species already at
/// target are counted only in `already_complete`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Outcome per common name.
    pub outcomes: BTreeMap<String, SpeciesOutcome>,
    /// Species that went to the network.
    pub attempted: usize,
    /// Species skipped as already complete.
    pub already_complete: usize,
    /// Species with at least one new image.
    pub done: usize,
    /// Species where nothing could be saved.
    pub failed: usize,
    /// New images saved across all species.
    pub images_saved: usize,
}

impl BuildReport {
    /// Records one species outcome and updates the tallies.
    pub fn record(&mut self, common_name: impl Into<String>, outcome: SpeciesOutcome) {
        match &outcome {
            SpeciesOutcome::AlreadyComplete { .. } => self.already_complete += 1,
            SpeciesOutcome::Done { saved } => {
                self.attempted += 1;
                self.done += 1;
                self.images_saved += saved;
            }
            SpeciesOutcome::Failed { .. } => {
                self.attempted += 1;
                self.failed += 1;
            }
        }
        self.outcomes.insert(common_name.into(), outcome);
    }

    /// Species processed in total.
    #[must_use]
    pub fn total(&self) -> usize {
        self.attempted + self.already_complete
    }

    /// Whether every species ended complete or done.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Whether some species failed while others succeeded or were complete.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.failed > 0 && self.failed < self.total()
    }

    /// Common names of failed species, sorted.
    #[must_use]
    pub fn failed_species(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, SpeciesOutcome::Failed { .. }))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
