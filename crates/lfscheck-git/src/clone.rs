//! Obtaining a local checkout for a repository URL.
//!
//! Cloning goes through the `git` CLI as a bare clone with LFS smudging
//! disabled, so only pointer files ever land on disk. The child process is
//! killed if it outlives [`CloneOptions::timeout`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use lfscheck_core::RepoReference;
use tokio::process::Command;

use crate::error::GitError;

/// Whether and how missing checkouts are cloned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloneOptions {
    pub enabled: bool,
    /// Upper bound for one `git clone`.
    pub timeout: Duration,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(600),
        }
    }
}

/// Location of `repo` under `root`: `<root>/<owner>/<name>`.
#[must_use]
pub fn checkout_path(root: &Path, repo: &RepoReference) -> PathBuf {
    root.join(&repo.owner).join(&repo.name)
}

/// Return a usable checkout of `repo` under `root`, cloning it if missing
/// and cloning is enabled. An existing checkout is reused as-is.
///
/// # Errors
///
/// Returns [`GitError::NotGitRepo`] if the location exists but is not a
/// repository, or is missing while cloning is disabled, and
/// [`GitError::Clone`] if the clone fails or times out.
pub async fn ensure_checkout(
    root: &Path,
    repo: &RepoReference,
    options: &CloneOptions,
) -> Result<PathBuf, GitError> {
    let path = checkout_path(root, repo);
    if path.exists() {
        gix::open(&path).map_err(|_| GitError::NotGitRepo(path.clone()))?;
        tracing::debug!(%repo, path = %path.display(), "reusing existing checkout");
        return Ok(path);
    }
    if !options.enabled {
        return Err(GitError::NotGitRepo(path));
    }
    let url = repo.url.as_deref().ok_or_else(|| GitError::Clone {
        url: repo.to_string(),
        reason: "no URL to clone from".to_string(),
    })?;
    clone_bare(url, &path, options.timeout).await?;
    Ok(path)
}

/// `git clone --bare --quiet <url> <dest>` without LFS content or prompts.
///
/// A partially written `dest` is removed on failure.
///
/// # Errors
///
/// Returns [`GitError::Clone`] if `git` cannot be run, exits non-zero, or
/// runs longer than `timeout`.
pub async fn clone_bare(url: &str, dest: &Path, timeout: Duration) -> Result<(), GitError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::info!(%url, dest = %dest.display(), "cloning repository");

    let child = Command::new("git")
        .args(["clone", "--bare", "--quiet", "--"])
        .arg(url)
        .arg(dest)
        .env("GIT_LFS_SKIP_SMUDGE", "1")
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| GitError::Clone {
            url: url.to_string(),
            reason: format!("run git clone: {e}"),
        })?;

    let reason = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => return Ok(()),
        Ok(Ok(output)) => String::from_utf8_lossy(&output.stderr).trim().to_string(),
        Ok(Err(e)) => format!("wait for git clone: {e}"),
        // Dropping the future kills the child.
        Err(_) => {
            tracing::warn!(%url, timeout_secs = timeout.as_secs(), "clone timed out");
            format!("timed out after {}s", timeout.as_secs_f32())
        }
    };

    if dest.exists() {
        let _ = std::fs::remove_dir_all(dest);
    }
    Err(GitError::Clone {
        url: url.to_string(),
        reason,
    })
}
