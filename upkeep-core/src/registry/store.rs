//! Registry store - persistence for project descriptors
//!
//! An explicit handle over the backing file. Every operation goes through
//! a store instance, so tests (and overrides) can point it anywhere; the
//! well-known config-root location is only the default.
//!
//! Mutations rewrite the whole file through a temp file in the same
//! directory followed by an atomic rename, so the store is never left
//! partially written.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, UpkeepError};
use crate::paths;

use super::RegistryEntry;

const HEADER: &str = "# upkeep registry\n# name|repo_url|branch|install_dir|version_file|install_cmd\n";

/// Handle to the persistent project registry.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    /// Open the store at the well-known location (honoring the
    /// `UPKEEP_REGISTRY` override).
    pub fn open() -> Result<Self> {
        let path = paths::registry_path()
            .map_err(|e| UpkeepError::Io(std::io::Error::other(e.to_string())))?;
        Ok(Self::at(path))
    }

    /// Open the store at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the backing file and its parent directory exist. Creates an
    /// empty store with a header comment when absent. Idempotent.
    pub fn init(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if !self.path.exists() {
            self.write_atomic(HEADER)?;
            debug!("Created registry at {}", self.path.display());
        }
        Ok(())
    }

    /// Register a project, replacing any prior entry with the same name.
    pub fn add(&self, entry: &RegistryEntry) -> Result<()> {
        entry.validate()?;
        self.init()?;

        // Upsert: drop the old entry if present, keep everything else
        // (including comments) in order, then append.
        match self.remove(&entry.name) {
            Ok(()) | Err(UpkeepError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let mut content = std::fs::read_to_string(&self.path)?;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&entry.to_line());
        content.push('\n');

        self.write_atomic(&content)?;
        debug!("Registered '{}' in {}", entry.name, self.path.display());
        Ok(())
    }

    /// Unregister a project. `NotFound` when no entry matched; callers
    /// treat that as non-fatal.
    pub fn remove(&self, name: &str) -> Result<()> {
        if !self.path.exists() {
            return Err(UpkeepError::NotFound(name.to_string()));
        }

        let content = std::fs::read_to_string(&self.path)?;
        let mut removed = false;
        let mut kept = String::with_capacity(content.len());

        for line in content.lines() {
            match RegistryEntry::parse_line(line) {
                Some(entry) if entry.name == name => removed = true,
                _ => {
                    kept.push_str(line);
                    kept.push('\n');
                }
            }
        }

        if !removed {
            return Err(UpkeepError::NotFound(name.to_string()));
        }

        self.write_atomic(&kept)?;
        debug!("Unregistered '{}' from {}", name, self.path.display());
        Ok(())
    }

    /// All entries in file order. Empty when the store is absent or
    /// unreadable; never fails.
    pub fn list(&self) -> Vec<RegistryEntry> {
        match self.read_all() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not read registry {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Parse every non-comment line into an entry. Malformed lines are
    /// skipped. Empty when the store is absent.
    pub fn read_all(&self) -> Result<Vec<RegistryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        Ok(content.lines().filter_map(RegistryEntry::parse_line).collect())
    }

    /// Look up a single entry by name.
    pub fn get(&self, name: &str) -> Result<RegistryEntry> {
        self.read_all()?
            .into_iter()
            .find(|e| e.name == name)
            .ok_or_else(|| UpkeepError::NotFound(name.to_string()))
    }

    /// Write the full store content through a same-directory temp file
    /// and rename it into place.
    fn write_atomic(&self, content: &str) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| UpkeepError::Io(e.error))?;
        Ok(())
    }
}
