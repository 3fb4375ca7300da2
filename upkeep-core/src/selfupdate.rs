//! Engine self-update
//!
//! Managed projects may bundle a copy of the engine binary in their
//! installed tree. After a full orchestration pass, if that bundled copy
//! differs byte-for-byte from the installed engine, the installed copy
//! is backed up with a timestamp suffix and replaced.
//!
//! The replacement never writes through the executing file: the new copy
//! is staged beside the installed one and swapped in with a rename, so
//! the running invocation finishes on the old code and the next one
//! picks up the new.
//!
//! Everything here is advisory. Failures are logged as warnings and
//! never fail the surrounding run.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::paths;
use crate::registry::RegistryEntry;

/// Run the self-update check. Warnings only; never fails the caller.
pub fn check(entries: &[RegistryEntry]) {
    match self_update(entries) {
        Ok(Some(source)) => {
            info!(
                "Engine updated from bundled copy {}; takes effect next run",
                source.display()
            );
        }
        Ok(None) => debug!("Self-update: nothing to do"),
        Err(e) => warn!("Self-update check failed: {}", e),
    }
}

fn self_update(entries: &[RegistryEntry]) -> Result<Option<PathBuf>> {
    let exe = std::env::current_exe()?;
    let canonical = match paths::engine_install_path() {
        Ok(p) => p,
        Err(e) => {
            debug!("Self-update: no canonical location: {}", e);
            return Ok(None);
        }
    };

    // Only act when running from the installed copy; build trees and
    // ad-hoc invocations are left alone.
    if exe != canonical {
        debug!(
            "Self-update: running from {}, not {}; skipping",
            exe.display(),
            canonical.display()
        );
        return Ok(None);
    }

    let name = match exe.file_name() {
        Some(n) => n.to_os_string(),
        None => return Ok(None),
    };

    let Some(bundled) = find_bundled(entries, &name) else {
        return Ok(None);
    };

    if files_identical(&exe, &bundled)? {
        debug!("Self-update: bundled copy matches installed engine");
        return Ok(None);
    }

    replace_installed(&exe, &bundled)?;
    Ok(Some(bundled))
}

/// Locate a bundled engine copy inside a managed project's installed
/// tree: `<install_dir>/bin/<name>` or `<install_dir>/<name>`, first
/// match in registry order wins. The installed engine's own path never
/// matches itself.
fn find_bundled(entries: &[RegistryEntry], name: &std::ffi::OsStr) -> Option<PathBuf> {
    let own = std::env::current_exe().ok();

    for entry in entries {
        let root = entry.install_dir_path();
        for candidate in [root.join("bin").join(name), root.join(name)] {
            if Some(&candidate) == own.as_ref() {
                continue;
            }
            if candidate.is_file() {
                debug!(
                    "Self-update: found bundled engine in '{}' at {}",
                    entry.name,
                    candidate.display()
                );
                return Some(candidate);
            }
        }
    }

    None
}

fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    Ok(std::fs::read(a)? == std::fs::read(b)?)
}

/// Back up the installed copy with a timestamp suffix, then stage the
/// bundled copy beside it and rename it into place.
fn replace_installed(installed: &Path, bundled: &Path) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let backup = PathBuf::from(format!("{}.{}.bak", installed.display(), stamp));
    std::fs::copy(installed, &backup)?;
    info!("Backed up installed engine to {}", backup.display());

    // Same-directory stage keeps the final rename atomic.
    let staged = PathBuf::from(format!("{}.staged", installed.display()));
    std::fs::copy(bundled, &staged)?;
    std::fs::rename(&staged, installed)?;

    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn entry(install_dir: &Path) -> RegistryEntry {
        RegistryEntry {
            name: "toolA".into(),
            repo_url: "https://github.com/example/toolA".into(),
            branch: "main".into(),
            install_dir: install_dir.to_string_lossy().into_owned(),
            version_file: install_dir.join("VERSION").to_string_lossy().into_owned(),
            install_cmd: String::new(),
        }
    }

    #[test]
    fn test_find_bundled_prefers_bin_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/upkeep"), "a").unwrap();
        std::fs::write(dir.path().join("upkeep"), "b").unwrap();

        let entries = vec![entry(dir.path())];
        let found = find_bundled(&entries, std::ffi::OsStr::new("upkeep")).unwrap();
        assert_eq!(found, dir.path().join("bin/upkeep"));
    }

    #[test]
    fn test_find_bundled_none_when_absent() {
        let dir = TempDir::new().unwrap();
        let entries = vec![entry(dir.path())];
        assert!(find_bundled(&entries, std::ffi::OsStr::new("upkeep")).is_none());
    }

    #[test]
    fn test_files_identical() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, "same").unwrap();
        std::fs::write(&b, "same").unwrap();
        assert!(files_identical(&a, &b).unwrap());

        std::fs::write(&b, "different").unwrap();
        assert!(!files_identical(&a, &b).unwrap());
    }

    #[test]
    fn test_replace_installed_backs_up_and_swaps() {
        let dir = TempDir::new().unwrap();
        let installed = dir.path().join("upkeep");
        let bundled = dir.path().join("bundled");
        std::fs::write(&installed, "old engine").unwrap();
        std::fs::write(&bundled, "new engine").unwrap();

        let backup = replace_installed(&installed, &bundled).unwrap();

        assert_eq!(std::fs::read_to_string(&installed).unwrap(), "new engine");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "old engine");
        assert!(!dir.path().join("upkeep.staged").exists());
    }

    #[test]
    fn test_check_is_noop_outside_canonical_location() {
        // Test binaries never run from the canonical install path, so
        // this exercises the skip branch without touching anything.
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("upkeep"), "bundled").unwrap();
        check(&[entry(dir.path())]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("upkeep")).unwrap(),
            "bundled"
        );
    }
}
