//! Registry-wide orchestration
//!
//! Walks the registry strictly in file order, one entry at a time, and
//! applies the update driver to the selected subset. Per-project
//! failures never abort the loop; registry-level I/O failures abort the
//! whole invocation.

use tracing::{debug, info};

use crate::error::Result;
use crate::registry::RegistryStore;
use crate::selfupdate;

use super::{RunOptions, UpdateDriver, UpdateOutcome, UpdateResult};

/// Which registered projects one pass covers.
#[derive(Debug, Clone)]
pub enum Selection {
    All,
    /// Explicit name subset. Names absent from the registry produce no
    /// result and no error.
    Names(Vec<String>),
}

impl Selection {
    pub fn from_names(names: Vec<String>) -> Self {
        if names.is_empty() {
            Selection::All
        } else {
            Selection::Names(names)
        }
    }

    fn includes(&self, name: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Names(names) => names.iter().any(|n| n == name),
        }
    }
}

/// Aggregate of one orchestration pass.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub results: Vec<UpdateResult>,
}

impl RunSummary {
    pub fn updated(&self) -> usize {
        self.count(UpdateOutcome::Updated)
    }

    pub fn failed(&self) -> usize {
        self.count(UpdateOutcome::Failed)
    }

    pub fn up_to_date(&self) -> usize {
        self.count(UpdateOutcome::UpToDate)
    }

    pub fn skipped(&self) -> usize {
        self.count(UpdateOutcome::Skipped)
    }

    /// A run succeeds iff no processed entry failed; up-to-date and
    /// skipped outcomes never count against it.
    pub fn succeeded(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, outcome: UpdateOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }
}

/// Iterates the registry and aggregates per-project results.
pub struct Orchestrator {
    store: RegistryStore,
    driver: UpdateDriver,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(store: RegistryStore, options: RunOptions) -> Result<Self> {
        Ok(Self {
            store,
            driver: UpdateDriver::new(options)?,
            options,
        })
    }

    /// Build an orchestrator around a pre-built driver (tests).
    pub fn with_driver(store: RegistryStore, driver: UpdateDriver, options: RunOptions) -> Self {
        Self {
            store,
            driver,
            options,
        }
    }

    /// Process the selection strictly in registry order. The registry is
    /// read once up front; the update path never mutates it.
    pub async fn run(&self, selection: &Selection) -> Result<RunSummary> {
        let entries = self.store.read_all()?;
        let mut summary = RunSummary::default();

        for entry in &entries {
            if !selection.includes(&entry.name) {
                debug!("{}: not selected, skipping", entry.name);
                continue;
            }

            let result = self.driver.update_one(entry).await;
            info!(
                "{}: {} ({} -> {})",
                result.name, result.outcome, result.local_version, result.remote_version
            );
            summary.results.push(result);
        }

        // Self-update only after a full, mutating pass; failures there
        // are warnings and never affect the summary.
        if matches!(selection, Selection::All) && !self.options.dry_run {
            selfupdate::check(&entries);
        }

        Ok(summary)
    }
}
