//! Well-known paths and placeholder expansion
//!
//! The registry lives at a single well-known path under the user's
//! configuration root. Entry paths may carry `~` and `$VAR` placeholders
//! that are expanded when the registry is read, not when it is written.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment variable overriding the registry file location.
pub const REGISTRY_ENV: &str = "UPKEEP_REGISTRY";

/// File name of the registry inside the config directory.
const REGISTRY_FILE: &str = "registry";

/// Resolve the registry file path: env override first, then the
/// platform config root.
pub fn registry_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(REGISTRY_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let config_dir = directories::ProjectDirs::from("dev", "upkeep", "upkeep")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .or_else(|| dirs::config_dir().map(|d| d.join("upkeep")))
        .context("Could not determine config directory")?;

    Ok(config_dir.join(REGISTRY_FILE))
}

/// Canonical installed location of the engine binary itself, used by
/// the self-update checker. The platform executable directory when the
/// OS defines one, `~/.local/bin` otherwise.
pub fn engine_install_path() -> Result<PathBuf> {
    let bin_dir = dirs::executable_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/bin")))
        .context("Could not determine executable directory")?;

    Ok(bin_dir.join("upkeep"))
}

/// Expand `~` (leading only) and `$VAR` placeholders in a stored path.
///
/// Unset variables expand to the empty string, matching shell behavior
/// closely enough for registry entries written by install scripts.
pub fn expand_placeholders(raw: &str) -> PathBuf {
    let mut s = raw.to_string();

    if s == "~" || s.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            s = format!("{}{}", home.display(), &s[1..]);
        }
    }

    if s.contains('$') {
        s = expand_vars(&s);
    }

    PathBuf::from(s)
}

fn expand_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        // Collect the variable name following `$` (alphanumeric + underscore).
        let mut name = String::new();
        while let Some(&(_, nc)) = chars.peek() {
            if nc.is_ascii_alphanumeric() || nc == '_' {
                name.push(nc);
                chars.next();
            } else {
                break;
            }
        }

        if name.is_empty() {
            out.push('$');
        } else {
            out.push_str(&std::env::var(&name).unwrap_or_default());
        }
    }

    out
}
