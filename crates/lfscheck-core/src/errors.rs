//! Cross-cutting error types for lfscheck.
//!
//! Domain-specific errors (`GitError`, `StoreError`, `ConfigError`) live in
//! their respective crates. The binary converges all of them through `anyhow`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can be raised by the core model and checkpoint layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A repository URL could not be turned into an owner/name pair.
    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidRepoUrl { url: String, reason: String },

    /// An object identifier is not `<algorithm>:<hex-digest>`.
    #[error("Invalid object id '{oid}': {reason}")]
    InvalidOid { oid: String, reason: String },

    /// A remediation status transition was attempted that is not allowed.
    #[error("Invalid status transition for {oid}: {from} -> {to}")]
    InvalidTransition {
        oid: String,
        from: String,
        to: String,
    },

    /// A persisted checkpoint file exists but is not usable.
    #[error("Invalid checkpoint {}: {reason}", path.display())]
    InvalidCheckpoint { path: PathBuf, reason: String },

    /// File glob for checkpoint discovery is malformed.
    #[error("Invalid glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },

    /// I/O error with the path that caused it.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
