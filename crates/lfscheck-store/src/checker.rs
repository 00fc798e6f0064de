//! Target-store existence checks.

use std::sync::Arc;

use lfscheck_core::{ObjectRecord, RepoReference};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::client::LfsStore;
use crate::error::StoreError;
use crate::retry::RetryPolicy;

/// A record whose existence could not be determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    pub record: ObjectRecord,
    pub reason: String,
}

/// Partition of the checked records. Every input record lands in exactly
/// one of the three lists, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    pub present: Vec<ObjectRecord>,
    pub missing: Vec<ObjectRecord>,
    pub errors: Vec<CheckFailure>,
}

impl CheckOutcome {
    #[must_use]
    pub fn total(&self) -> usize {
        self.present.len() + self.missing.len() + self.errors.len()
    }
}

enum Verdict {
    Present,
    Missing,
    Errored(String),
}

/// Checks records against a store with bounded concurrency.
pub struct ExistenceChecker<S> {
    store: Arc<S>,
    retry: RetryPolicy,
    permits: Arc<Semaphore>,
    batch_size: usize,
}

impl<S: LfsStore> ExistenceChecker<S> {
    #[must_use]
    pub fn new(store: Arc<S>, retry: RetryPolicy, concurrency: usize, batch_size: usize) -> Self {
        Self {
            store,
            retry,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            batch_size: batch_size.max(1),
        }
    }

    /// Check every record of `repo`.
    ///
    /// Transient failures are retried; a record that still fails is reported
    /// in [`CheckOutcome::errors`], never as present or missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Auth`] as soon as any call is refused; in-flight
    /// checks are cancelled.
    pub async fn check(
        &self,
        repo: &RepoReference,
        records: Vec<ObjectRecord>,
    ) -> Result<CheckOutcome, StoreError> {
        let mut outcome = CheckOutcome::default();
        let mut records = records.into_iter().peekable();

        while records.peek().is_some() {
            let batch: Vec<ObjectRecord> = records.by_ref().take(self.batch_size).collect();
            let verdicts = self.check_batch(repo, &batch).await?;
            for (record, verdict) in batch.into_iter().zip(verdicts) {
                match verdict {
                    Verdict::Present => outcome.present.push(record),
                    Verdict::Missing => {
                        tracing::warn!(repo = %repo, oid = %record.oid, size = record.size, "object missing from {}", self.store.name());
                        outcome.missing.push(record);
                    }
                    Verdict::Errored(reason) => {
                        tracing::warn!(repo = %repo, oid = %record.oid, %reason, "existence check failed");
                        outcome.errors.push(CheckFailure { record, reason });
                    }
                }
            }
        }

        tracing::info!(
            repo = %repo,
            present = outcome.present.len(),
            missing = outcome.missing.len(),
            errors = outcome.errors.len(),
            "checked objects"
        );
        Ok(outcome)
    }

    async fn check_batch(
        &self,
        repo: &RepoReference,
        batch: &[ObjectRecord],
    ) -> Result<Vec<Verdict>, StoreError> {
        let mut set = JoinSet::new();
        for (idx, record) in batch.iter().enumerate() {
            let store = Arc::clone(&self.store);
            let permits = Arc::clone(&self.permits);
            let retry = self.retry;
            let repo = repo.clone();
            let oid = record.oid.clone();
            set.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (idx, Err(StoreError::Permanent {
                        store: store.name().to_string(),
                        reason: "checker shut down".to_string(),
                    }));
                };
                let result = retry
                    .run("exists", || store.exists(&repo, &oid))
                    .await;
                (idx, result)
            });
        }

        let mut verdicts: Vec<Option<Verdict>> = (0..batch.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            let (idx, result) = match joined {
                Ok(done) => done,
                Err(error) => {
                    tracing::error!(%error, "existence check task failed");
                    continue;
                }
            };
            verdicts[idx] = Some(match result {
                Ok(true) => Verdict::Present,
                Ok(false) => Verdict::Missing,
                Err(error) if error.is_auth() => {
                    set.abort_all();
                    return Err(error);
                }
                Err(error) => Verdict::Errored(error.to_string()),
            });
        }

        Ok(verdicts
            .into_iter()
            .map(|v| v.unwrap_or_else(|| Verdict::Errored("check task did not complete".to_string())))
            .collect())
    }
}
