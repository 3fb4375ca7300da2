//! Update engine - per-project driver and registry-wide orchestration
//!
//! The driver applies the compare-and-update algorithm to one entry:
//! resolve versions, stop on exact equality, otherwise shallow-clone the
//! project and re-run its own installer (or copy the clone over the
//! installed tree). The orchestrator walks the registry in file order,
//! applies the driver to the selected subset, and aggregates outcomes.

mod driver;
mod orchestrator;

pub use driver::UpdateDriver;
pub use orchestrator::{Orchestrator, RunSummary, Selection};

use std::fmt;

/// Options for one orchestration pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compute and report actions without executing them.
    pub dry_run: bool,
    /// Ask project installers to skip their test suites.
    pub skip_tests: bool,
}

/// Per-project outcome of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate,
    Updated,
    Failed,
    Skipped,
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpdateOutcome::UpToDate => "up-to-date",
            UpdateOutcome::Updated => "updated",
            UpdateOutcome::Failed => "failed",
            UpdateOutcome::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Transient result of updating one project. Produced fresh each run,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub name: String,
    pub local_version: String,
    pub remote_version: String,
    pub outcome: UpdateOutcome,
    /// Human-readable explanation (failure cause, "would update", ...).
    pub detail: String,
}

impl UpdateResult {
    pub(crate) fn new(
        name: &str,
        local: &str,
        remote: &str,
        outcome: UpdateOutcome,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            local_version: local.to_string(),
            remote_version: remote.to_string(),
            outcome,
            detail: detail.into(),
        }
    }
}
