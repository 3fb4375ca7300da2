//! Project registry - descriptors for self-registered CLI tool projects
//!
//! Each managed project registers one entry describing where its source
//! lives, where it is installed, and how to re-run its own installer.
//! Entries persist as one pipe-separated line each in a flat text file:
//!
//! ```text
//! name|repo_url|branch|install_dir|version_file|install_cmd
//! ```
//!
//! `#` lines and blank lines are ignored. Lines with the wrong field
//! count are skipped on read, never fatal.

mod store;

pub use store::RegistryStore;

use std::path::PathBuf;

use crate::error::{Result, UpkeepError};
use crate::paths;

/// Number of pipe-separated fields per registry line.
const FIELD_COUNT: usize = 6;

/// Flag the update driver appends to install commands so the project's
/// installer overwrites an existing installation without re-prompting.
pub const FORCE_FLAG: &str = "--force";

/// Flag propagated to install commands when a run requests skipping tests.
pub const SKIP_TESTS_FLAG: &str = "--skip-tests";

/// A project's install command as a structured descriptor.
///
/// Parsed from the registered command string with shell-words, so quoted
/// arguments containing whitespace survive intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl InstallCommand {
    /// Parse a command string. `Ok(None)` for an empty/blank string,
    /// `Err` for strings shell-words cannot tokenize (unbalanced quotes).
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let tokens = shell_words::split(raw)
            .map_err(|e| UpkeepError::Validation(format!("invalid install command: {e}")))?;

        let mut iter = tokens.into_iter();
        let program = match iter.next() {
            Some(p) => p,
            None => return Ok(None),
        };

        // A quoted empty token ("") tokenizes to an empty program that
        // could never spawn; reject it up front.
        if program.is_empty() {
            return Err(UpkeepError::Validation(
                "install command program must not be empty".into(),
            ));
        }

        Ok(Some(Self {
            program,
            args: iter.collect(),
        }))
    }

    /// Argument vector for one invocation: the registered args, plus the
    /// force-overwrite flag if absent (the version check already decided
    /// an update is due), plus the skip-tests flag when requested.
    pub fn argv(&self, skip_tests: bool) -> Vec<String> {
        let mut args = self.args.clone();
        if !args.iter().any(|a| a == FORCE_FLAG) {
            args.push(FORCE_FLAG.to_string());
        }
        if skip_tests && !args.iter().any(|a| a == SKIP_TESTS_FLAG) {
            args.push(SKIP_TESTS_FLAG.to_string());
        }
        args
    }
}

/// One registered project's update metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Unique key, non-empty.
    pub name: String,
    /// Clone URL of the project's source repository.
    pub repo_url: String,
    /// Branch holding releases (and the VERSION artifact).
    pub branch: String,
    /// Installed tree; may contain `~`/`$VAR` placeholders.
    pub install_dir: String,
    /// Plain-text file holding the installed version string.
    pub version_file: String,
    /// Raw install command string; empty means copy-over install.
    pub install_cmd: String,
}

impl RegistryEntry {
    /// Validate the fields a registration must carry.
    ///
    /// install_cmd is tokenized here so malformed commands are rejected
    /// at registration time rather than mid-update.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(UpkeepError::Validation("name must not be empty".into()));
        }
        if self.repo_url.trim().is_empty() {
            return Err(UpkeepError::Validation("repo_url must not be empty".into()));
        }
        if self.branch.trim().is_empty() {
            return Err(UpkeepError::Validation("branch must not be empty".into()));
        }

        for (field, value) in [
            ("name", &self.name),
            ("repo_url", &self.repo_url),
            ("branch", &self.branch),
            ("install_dir", &self.install_dir),
            ("version_file", &self.version_file),
            ("install_cmd", &self.install_cmd),
        ] {
            if value.contains('|') {
                return Err(UpkeepError::Validation(format!(
                    "{field} must not contain '|'"
                )));
            }
            if value.contains('\n') {
                return Err(UpkeepError::Validation(format!(
                    "{field} must not contain newlines"
                )));
            }
        }

        InstallCommand::parse(&self.install_cmd)?;
        Ok(())
    }

    /// Parse one registry line. `None` for comments, blanks, and lines
    /// with the wrong field count.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            return None;
        }

        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() != FIELD_COUNT {
            tracing::debug!(
                "Skipping malformed registry line ({} fields, expected {})",
                fields.len(),
                FIELD_COUNT
            );
            return None;
        }

        Some(Self {
            name: fields[0].to_string(),
            repo_url: fields[1].to_string(),
            branch: fields[2].to_string(),
            install_dir: fields[3].to_string(),
            version_file: fields[4].to_string(),
            install_cmd: fields[5].to_string(),
        })
    }

    /// Serialize to one registry line (no trailing newline).
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.name,
            self.repo_url,
            self.branch,
            self.install_dir,
            self.version_file,
            self.install_cmd
        )
    }

    /// install_dir with placeholders expanded.
    pub fn install_dir_path(&self) -> PathBuf {
        paths::expand_placeholders(&self.install_dir)
    }

    /// version_file with placeholders expanded.
    pub fn version_file_path(&self) -> PathBuf {
        paths::expand_placeholders(&self.version_file)
    }

    /// The structured install command, if one is registered.
    pub fn install_command(&self) -> Result<Option<InstallCommand>> {
        InstallCommand::parse(&self.install_cmd)
    }
}
