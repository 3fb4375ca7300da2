//! Per-project update driver
//!
//! Implements the compare-and-update algorithm for a single registry
//! entry. Version comparison is exact string equality; formatting
//! differences between the local and remote strings count as a real
//! update. The scratch clone lives in a TempDir whose guard removes it
//! on every exit path, including early returns and failures.

use std::path::Path;
use std::process::Stdio;

use tracing::{debug, info, warn};

use crate::error::{Result, UpkeepError};
use crate::registry::{InstallCommand, RegistryEntry};
use crate::version::{self, RemoteVersionSource, VersionResolver};

use super::{RunOptions, UpdateOutcome, UpdateResult};

/// Drives the update of individual registry entries.
pub struct UpdateDriver {
    remote: Box<dyn RemoteVersionSource>,
    options: RunOptions,
}

impl UpdateDriver {
    pub fn new(options: RunOptions) -> Result<Self> {
        Ok(Self {
            remote: Box::new(VersionResolver::new()?),
            options,
        })
    }

    /// Build a driver over an alternative version source (tests).
    pub fn with_source(remote: Box<dyn RemoteVersionSource>, options: RunOptions) -> Self {
        Self { remote, options }
    }

    /// Compare the entry's installed and released versions and bring it
    /// current. Failures are captured in the result; this never
    /// propagates an error to the orchestrator loop.
    pub async fn update_one(&self, entry: &RegistryEntry) -> UpdateResult {
        let local = version::local_version(&entry.version_file_path());

        let remote = match self.remote.released_version(&entry.repo_url, &entry.branch).await {
            Ok(v) => v,
            Err(e) => {
                warn!("{}: remote version unavailable: {}", entry.name, e);
                return UpdateResult::new(
                    &entry.name,
                    &local,
                    version::UNKNOWN,
                    UpdateOutcome::Failed,
                    e.to_string(),
                );
            }
        };

        // Exact string equality, no semantic ordering.
        if local == remote {
            debug!("{}: already at {}", entry.name, local);
            return UpdateResult::new(&entry.name, &local, &remote, UpdateOutcome::UpToDate, "");
        }

        if self.options.dry_run {
            return UpdateResult::new(
                &entry.name,
                &local,
                &remote,
                UpdateOutcome::Skipped,
                format!("would update {local} -> {remote}"),
            );
        }

        info!("{}: updating {} -> {}", entry.name, local, remote);
        match self.apply(entry).await {
            Ok(()) => UpdateResult::new(&entry.name, &local, &remote, UpdateOutcome::Updated, ""),
            Err(e) => {
                warn!("{}: update failed: {}", entry.name, e);
                UpdateResult::new(&entry.name, &local, &remote, UpdateOutcome::Failed, e.to_string())
            }
        }
    }

    /// Fetch a fresh copy and run the project's installer (or copy the
    /// clone over the installed tree when none is registered).
    async fn apply(&self, entry: &RegistryEntry) -> Result<()> {
        // The guard owns the scratch directory for the whole update; Drop
        // removes it even when the clone or installer bails out.
        let scratch = tempfile::tempdir()?;

        clone_shallow(&entry.repo_url, &entry.branch, scratch.path()).await?;

        match entry.install_command()? {
            Some(cmd) => {
                run_installer(&cmd, scratch.path(), self.options.skip_tests).await?;
            }
            None => {
                let dest = entry.install_dir_path();
                copy_dir_over(scratch.path(), &dest)?;
                info!("{}: copied into {}", entry.name, dest.display());
            }
        }

        Ok(())
    }
}

/// Shallow-clone `repo_url` at `branch` into an (empty) scratch
/// directory. No timeout: large working copies may legitimately take a
/// while, matching the version fetch being the only bounded call.
async fn clone_shallow(repo_url: &str, branch: &str, dest: &Path) -> Result<()> {
    debug!("Cloning {} ({}) into {}", repo_url, branch, dest.display());

    let output = tokio::process::Command::new("git")
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg("--branch")
        .arg(branch)
        .arg(repo_url)
        .arg(dest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| UpkeepError::Fetch(format!("failed to spawn git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(UpkeepError::Fetch(format!(
            "git clone of {} ({}) failed: {}",
            repo_url,
            branch,
            stderr.trim()
        )));
    }

    Ok(())
}

/// Run the registered install command from the root of the fresh clone,
/// streaming its output to the terminal.
async fn run_installer(cmd: &InstallCommand, workdir: &Path, skip_tests: bool) -> Result<()> {
    let args = cmd.argv(skip_tests);
    info!("Running installer: {} {}", cmd.program, args.join(" "));

    let status = tokio::process::Command::new(&cmd.program)
        .args(&args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| UpkeepError::Install(format!("failed to spawn {}: {e}", cmd.program)))?;

    if !status.success() {
        return Err(UpkeepError::Install(format!(
            "{} exited with {}",
            cmd.program,
            status.code().map_or("signal".to_string(), |c| c.to_string())
        )));
    }

    Ok(())
}

/// Recursively copy the clone's contents over the installed tree,
/// leaving `.git` behind. Existing files are overwritten in place.
fn copy_dir_over(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;

    for item in std::fs::read_dir(src)? {
        let item = item?;
        let name = item.file_name();
        if name == ".git" {
            continue;
        }

        let target = dest.join(&name);
        let file_type = item.file_type()?;
        if file_type.is_symlink() {
            copy_symlink(&item.path(), &target)?;
        } else if file_type.is_dir() {
            copy_dir_over(&item.path(), &target)?;
        } else {
            std::fs::copy(item.path(), &target)?;
        }
    }

    Ok(())
}

/// Recreate a symlink at `target` instead of dereferencing it, so
/// relative links (and broken ones) survive the copy-over.
#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let referent = std::fs::read_link(link)?;
    match std::fs::remove_file(target) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    std::os::unix::fs::symlink(&referent, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, _target: &Path) -> Result<()> {
    warn!("Skipping symlink {} during copy-over", link.display());
    Ok(())
}
