//! Store error types.

/// Errors from a store call, classified by how the caller should react.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The object does not exist.
    #[error("object not found in {store}: {key}")]
    NotFound { store: String, key: String },

    /// Credentials missing, expired or insufficient. Aborts the stage.
    #[error("authorization failed for {store}: {reason}")]
    Auth { store: String, reason: String },

    /// Throttling, 5xx or connection failure. Retried.
    #[error("transient error from {store}: {reason}")]
    Transient { store: String, reason: String },

    /// The call exceeded the per-operation timeout. Retried.
    #[error("{store} call timed out after {seconds}s")]
    Timeout { store: String, seconds: u64 },

    /// Any other failure. Not retried.
    #[error("{store} error: {reason}")]
    Permanent { store: String, reason: String },

    /// The client could not be constructed from configuration.
    #[error("failed to build {store} client: {reason}")]
    Build { store: String, reason: String },
}

impl StoreError {
    /// Whether a retry may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Timeout { .. })
    }

    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Map an `object_store` error for `key` onto the retry taxonomy.
    pub(crate) fn classify(store: &str, key: &str, error: object_store::Error) -> Self {
        let store = store.to_string();
        match error {
            object_store::Error::NotFound { .. } => Self::NotFound {
                store,
                key: key.to_string(),
            },
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => Self::Auth {
                store,
                reason: error.to_string(),
            },
            object_store::Error::Generic { .. } | object_store::Error::JoinError { .. } => {
                Self::Transient {
                    store,
                    reason: error.to_string(),
                }
            }
            other => Self::Permanent {
                store,
                reason: other.to_string(),
            },
        }
    }
}
