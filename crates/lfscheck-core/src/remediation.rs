//! Remediation entries and their status state machine.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::object_map::ObjectRecord;
use crate::oid::Oid;
use crate::repo::RepoReference;

/// Progress of copying one object from the source store to the target store.
///
/// ```text
/// pending → fetched → verified → uploaded
///         → uploaded                (already present in target)
/// pending | fetched | verified → failed(reason)
/// failed → pending                  (retry on a later run)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemediationStatus {
    Pending,
    Fetched,
    Verified,
    Uploaded,
    Failed(String),
}

impl RemediationStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetched => "fetched",
            Self::Verified => "verified",
            Self::Uploaded => "uploaded",
            Self::Failed(_) => "failed",
        }
    }

    /// Whether transitioning to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (
                Self::Pending,
                Self::Fetched | Self::Uploaded | Self::Failed(_)
            ) | (Self::Fetched, Self::Verified | Self::Failed(_))
                | (Self::Verified, Self::Uploaded | Self::Failed(_))
                | (Self::Failed(_), Self::Pending)
        )
    }

    /// `Uploaded` and `Failed` end a run for an entry.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Uploaded | Self::Failed(_))
    }

    #[must_use]
    pub const fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded)
    }
}

impl fmt::Display for RemediationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// One object awaiting (or done with) remediation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RemediationEntry {
    #[serde(flatten)]
    pub oid: Oid,
    pub size: u64,
    pub status: RemediationStatus,
}

impl RemediationEntry {
    /// A fresh `Pending` entry for a missing record.
    #[must_use]
    pub fn pending(record: &ObjectRecord) -> Self {
        Self {
            oid: record.oid.clone(),
            size: record.size,
            status: RemediationStatus::Pending,
        }
    }

    /// Move to `next`, enforcing the state machine.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] for a disallowed transition.
    pub fn advance(&mut self, next: RemediationStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(&next) {
            return Err(CoreError::InvalidTransition {
                oid: self.oid.to_string(),
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Bring a non-uploaded entry back to `Pending` before a new attempt.
    ///
    /// Entries left in `Fetched` or `Verified` by an interrupted run are reset
    /// too; only `Uploaded` survives.
    pub fn reset_for_retry(&mut self) {
        if !self.status.is_uploaded() {
            self.status = RemediationStatus::Pending;
        }
    }
}

/// Remediation entries for one repository, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepoRemediation {
    pub repo_owner: String,
    pub repo_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    pub objects: Vec<RemediationEntry>,
}

impl RepoRemediation {
    #[must_use]
    pub fn new(repo: &RepoReference, objects: Vec<RemediationEntry>) -> Self {
        Self {
            repo_owner: repo.owner.clone(),
            repo_name: repo.name.clone(),
            repo_url: repo.url.clone(),
            objects,
        }
    }

    #[must_use]
    pub fn repo(&self) -> RepoReference {
        RepoReference {
            owner: self.repo_owner.clone(),
            name: self.repo_name.clone(),
            url: self.repo_url.clone(),
        }
    }

    /// Entries not yet uploaded.
    pub fn outstanding(&self) -> impl Iterator<Item = &RemediationEntry> {
        self.objects.iter().filter(|e| !e.status.is_uploaded())
    }
}
