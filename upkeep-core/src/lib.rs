//! upkeep-core library exports

pub mod error;
pub mod paths;
pub mod platform;
pub mod registry;
pub mod selfupdate;
pub mod update;
pub mod version;

pub use error::{Result, UpkeepError};
pub use registry::{InstallCommand, RegistryEntry, RegistryStore};
pub use update::{Orchestrator, RunOptions, RunSummary, Selection, UpdateOutcome, UpdateResult};
