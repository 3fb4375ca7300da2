//! Version resolution
//!
//! The authoritative released version of a project is a plain-text
//! `VERSION` artifact at the root of its repository on the registered
//! branch; the installed version is whatever its version file holds.
//! Comparison elsewhere is exact string equality, so both sides are
//! returned trimmed but otherwise untouched.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, UpkeepError};

/// Well-known version artifact name at the repository root.
pub const VERSION_ARTIFACT: &str = "VERSION";

/// Bounded timeout for the remote version fetch. The clone later in the
/// update path intentionally has none.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Local version reported when the version file does not exist.
pub const NOT_INSTALLED: &str = "not installed";

/// Local version reported when the version file exists but is unreadable.
pub const UNKNOWN: &str = "unknown";

/// Source of authoritative released versions. The update driver only
/// depends on this seam, so tests can substitute fixed versions.
#[async_trait]
pub trait RemoteVersionSource: Send + Sync {
    async fn released_version(&self, repo_url: &str, branch: &str) -> Result<String>;
}

/// HTTP-backed resolver fetching the VERSION artifact over raw content
/// URLs.
pub struct VersionResolver {
    client: reqwest::Client,
}

impl VersionResolver {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("upkeep/", env!("CARGO_PKG_VERSION")))
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| UpkeepError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteVersionSource for VersionResolver {
    /// Fetch the released version from the branch's VERSION artifact.
    /// Any failure (including an empty body) is a `Network` error scoped
    /// to the one project being resolved.
    async fn released_version(&self, repo_url: &str, branch: &str) -> Result<String> {
        let url = raw_version_url(repo_url, branch);
        debug!("Fetching remote version from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| UpkeepError::Network(format!("version fetch failed for {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(UpkeepError::Network(format!(
                "version fetch failed: HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpkeepError::Network(format!("failed to read version body: {e}")))?;

        let version = body.trim().to_string();
        if version.is_empty() {
            return Err(UpkeepError::Network(format!("empty version artifact at {url}")));
        }

        Ok(version)
    }
}

/// Read the installed version. Never fails: absent file means the
/// project is not installed, unreadable means unknown.
pub fn local_version(version_file: &Path) -> String {
    if !version_file.exists() {
        return NOT_INSTALLED.to_string();
    }
    match std::fs::read_to_string(version_file) {
        Ok(content) => content.trim().to_string(),
        Err(e) => {
            debug!("Version file {} unreadable: {}", version_file.display(), e);
            UNKNOWN.to_string()
        }
    }
}

/// Map a repository URL to the raw-content URL of its VERSION artifact.
///
/// GitHub repositories go through raw.githubusercontent.com; other hosts
/// get the common `<repo>/raw/<branch>/<file>` layout (GitLab, Gitea).
pub fn raw_version_url(repo_url: &str, branch: &str) -> String {
    let repo = repo_url.trim_end_matches('/').trim_end_matches(".git");

    if let Some(path) = repo
        .strip_prefix("https://github.com/")
        .or_else(|| repo.strip_prefix("http://github.com/"))
    {
        return format!("https://raw.githubusercontent.com/{path}/{branch}/{VERSION_ARTIFACT}");
    }

    format!("{repo}/raw/{branch}/{VERSION_ARTIFACT}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_github_raw_url() {
        let url = raw_version_url("https://github.com/example/toolA.git", "main");
        assert_eq!(
            url,
            "https://raw.githubusercontent.com/example/toolA/main/VERSION"
        );
    }

    #[test]
    fn test_github_url_without_git_suffix() {
        let url = raw_version_url("https://github.com/example/toolA/", "release");
        assert_eq!(
            url,
            "https://raw.githubusercontent.com/example/toolA/release/VERSION"
        );
    }

    #[test]
    fn test_other_host_raw_url() {
        let url = raw_version_url("https://git.example.com/tools/toolA.git", "main");
        assert_eq!(url, "https://git.example.com/tools/toolA/raw/main/VERSION");
    }

    #[test]
    fn test_local_absent_is_not_installed() {
        let dir = TempDir::new().unwrap();
        assert_eq!(local_version(&dir.path().join("VERSION")), NOT_INSTALLED);
    }

    #[test]
    fn test_local_reads_and_trims() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("VERSION");
        std::fs::write(&file, "1.2.3\n").unwrap();
        assert_eq!(local_version(&file), "1.2.3");
    }

    #[tokio::test]
    async fn test_remote_unreachable_is_network_error() {
        let resolver = VersionResolver::new().unwrap();
        // Port 1 on loopback refuses connections immediately.
        let result = resolver
            .released_version("http://127.0.0.1:1/example/toolA", "main")
            .await;
        assert!(matches!(result, Err(UpkeepError::Network(_))));
    }
}
