use std::path::PathBuf;

use thiserror::Error;

/// Errors reading a repository. All of them are recoverable per repository:
/// the repository is skipped and the run continues.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a git repository: {0}")]
    NotGitRepo(PathBuf),
    #[error("failed to list references: {0}")]
    References(String),
    #[error("failed to read object {id}: {reason}")]
    Object { id: String, reason: String },
    #[error("no references selected in {0}")]
    NoRefsSelected(String),
    #[error("invalid branch pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("clone of '{url}' failed: {reason}")]
    Clone { url: String, reason: String },
}

impl GitError {
    pub(crate) fn object(id: impl ToString, reason: impl ToString) -> Self {
        Self::Object {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}
