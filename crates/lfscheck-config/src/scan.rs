//! Mapping-stage configuration: which refs to scan and how.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Branches matching this pattern are scanned in addition to tags and the
/// default branch.
pub const DEFAULT_BRANCH_PATTERN: &str = r"^v\d.*";

/// Upper bound for a blob to be considered as a pointer file.
const fn default_max_pointer_size() -> u64 {
    1024
}

fn default_branch_pattern() -> String {
    String::from(DEFAULT_BRANCH_PATTERN)
}

fn default_repo_concurrency() -> usize {
    std::thread::available_parallelism()
        .map_or(4, std::num::NonZeroUsize::get)
        .min(8)
}

const fn default_clone() -> bool {
    true
}

const fn default_clone_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Regular expression for extra branches to scan (`^` is implied).
    #[serde(default = "default_branch_pattern")]
    pub branch_pattern: String,

    /// Blobs larger than this many bytes are never read.
    #[serde(default = "default_max_pointer_size")]
    pub max_pointer_size: u64,

    /// Repositories mapped concurrently.
    #[serde(default = "default_repo_concurrency")]
    pub repo_concurrency: usize,

    /// Directory holding `<owner>/<name>` checkouts. Empty means a temporary
    /// directory for the duration of the run.
    #[serde(default)]
    pub checkout_root: String,

    /// Clone missing checkouts (bare, no LFS content).
    #[serde(default = "default_clone")]
    pub clone: bool,

    /// A `git clone` running longer than this is killed and the repository
    /// skipped.
    #[serde(default = "default_clone_timeout_secs")]
    pub clone_timeout_secs: u64,

    /// Record refs and paths for every object.
    #[serde(default)]
    pub full_map: bool,

    /// Scan repositories even if a valid object map is already persisted.
    #[serde(default)]
    pub rescan: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            branch_pattern: default_branch_pattern(),
            max_pointer_size: default_max_pointer_size(),
            repo_concurrency: default_repo_concurrency(),
            checkout_root: String::new(),
            clone: default_clone(),
            clone_timeout_secs: default_clone_timeout_secs(),
            full_map: false,
            rescan: false,
        }
    }
}

impl ScanConfig {
    /// Configured checkout root, if any.
    #[must_use]
    pub fn checkout_root(&self) -> Option<PathBuf> {
        if self.checkout_root.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.checkout_root))
        }
    }

    #[must_use]
    pub const fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }
}
