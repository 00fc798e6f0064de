//! Copying missing objects from the source store to the target store.
//!
//! Per entry: confirm the object is still missing from the target, fetch it
//! from the source, verify the fetched length against the declared size,
//! upload, and confirm presence. A size mismatch is never uploaded. Entries
//! are independent; only an authorization failure stops the run.

use std::collections::HashMap;
use std::sync::Arc;

use lfscheck_core::{RemediationEntry, RemediationStatus, RepoReference};
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::client::LfsStore;
use crate::error::StoreError;
use crate::retry::RetryPolicy;

/// Tuning for [`RemediationEngine`].
#[derive(Debug, Clone, Copy)]
pub struct RemediationOptions {
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Stop before fetching; entries that need a copy stay `Pending`.
    pub dry_run: bool,
    /// Compare the SHA-256 of fetched content with the object id.
    pub verify_digest: bool,
}

impl Default for RemediationOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            retry: RetryPolicy::default(),
            dry_run: false,
            verify_digest: false,
        }
    }
}

pub struct RemediationEngine<S, T> {
    source: Arc<S>,
    target: Arc<T>,
    options: RemediationOptions,
    permits: Arc<Semaphore>,
}

impl<S: LfsStore, T: LfsStore> RemediationEngine<S, T> {
    #[must_use]
    pub fn new(source: Arc<S>, target: Arc<T>, options: RemediationOptions) -> Self {
        Self {
            source,
            target,
            permits: Arc::new(Semaphore::new(options.concurrency.max(1))),
            options,
        }
    }

    /// Process `entries` for `repo` and return them with updated statuses,
    /// in input order. `Uploaded` entries are returned untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Auth`] if either store refuses a call; no
    /// further entries are started.
    pub async fn remediate(
        &self,
        repo: &RepoReference,
        entries: Vec<RemediationEntry>,
    ) -> Result<Vec<RemediationEntry>, StoreError> {
        let mut results: Vec<Option<RemediationEntry>> = (0..entries.len()).map(|_| None).collect();
        let mut spawned = HashMap::new();
        let mut set = JoinSet::new();

        for (idx, entry) in entries.into_iter().enumerate() {
            if entry.status.is_uploaded() {
                results[idx] = Some(entry);
                continue;
            }
            let source = Arc::clone(&self.source);
            let target = Arc::clone(&self.target);
            let permits = Arc::clone(&self.permits);
            let options = self.options;
            let repo = repo.clone();
            let original = entry.clone();
            let handle = set.spawn(async move {
                let fallback = entry.clone();
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (idx, Ok(fallback));
                };
                (idx, process(&*source, &*target, &options, &repo, entry).await)
            });
            spawned.insert(handle.id(), (idx, original));
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, Ok(entry))) => results[idx] = Some(entry),
                Ok((_, Err(error))) => {
                    set.abort_all();
                    tracing::error!(repo = %repo, %error, "remediation aborted");
                    return Err(error);
                }
                Err(error) => {
                    // A task that died still owes its entry to the report.
                    if let Some((idx, mut entry)) = spawned.remove(&error.id()) {
                        entry.reset_for_retry();
                        fail(&mut entry, repo, format!("remediation task panicked: {error}"));
                        results[idx] = Some(entry);
                    } else {
                        tracing::error!(%error, "remediation task failed");
                    }
                }
            }
        }

        let entries: Vec<RemediationEntry> = results.into_iter().flatten().collect();
        let uploaded = entries.iter().filter(|e| e.status.is_uploaded()).count();
        let failed = entries
            .iter()
            .filter(|e| matches!(e.status, RemediationStatus::Failed(_)))
            .count();
        tracing::info!(repo = %repo, total = entries.len(), uploaded, failed, "remediated objects");
        Ok(entries)
    }
}

fn transition(entry: &mut RemediationEntry, next: RemediationStatus) {
    if let Err(error) = entry.advance(next) {
        tracing::error!(%error, "remediation state machine violated");
        entry.status = RemediationStatus::Failed(error.to_string());
    }
}

fn fail(entry: &mut RemediationEntry, repo: &RepoReference, reason: String) {
    tracing::warn!(repo = %repo, oid = %entry.oid, %reason, "remediation failed");
    transition(entry, RemediationStatus::Failed(reason));
}

/// Drive one entry through the state machine. `Err` only for auth failures.
async fn process<S: LfsStore, T: LfsStore>(
    source: &S,
    target: &T,
    options: &RemediationOptions,
    repo: &RepoReference,
    mut entry: RemediationEntry,
) -> Result<RemediationEntry, StoreError> {
    entry.reset_for_retry();
    let retry = options.retry;

    let present = retry
        .run("target exists", || target.exists(repo, &entry.oid))
        .await;
    match present {
        Ok(true) => {
            tracing::debug!(repo = %repo, oid = %entry.oid, "already present in target");
            transition(&mut entry, RemediationStatus::Uploaded);
            return Ok(entry);
        }
        Ok(false) => {}
        Err(error) if error.is_auth() => return Err(error),
        Err(error) => {
            fail(&mut entry, repo, format!("target check: {error}"));
            return Ok(entry);
        }
    }

    if options.dry_run {
        tracing::info!(repo = %repo, oid = %entry.oid, size = entry.size, "dry run: would copy object");
        return Ok(entry);
    }

    let fetched = retry.run("source get", || source.get(repo, &entry.oid)).await;
    let data = match fetched {
        Ok(data) => data,
        Err(error) if error.is_auth() => return Err(error),
        Err(error) if error.is_not_found() => {
            fail(&mut entry, repo, format!("not found in {}", source.name()));
            return Ok(entry);
        }
        Err(error) => {
            fail(&mut entry, repo, format!("fetch: {error}"));
            return Ok(entry);
        }
    };
    transition(&mut entry, RemediationStatus::Fetched);

    let length = data.len() as u64;
    let declared = entry.size;
    if length != declared {
        fail(
            &mut entry,
            repo,
            format!("size mismatch: declared {declared}, fetched {length}"),
        );
        return Ok(entry);
    }
    if options.verify_digest {
        let actual = hex::encode(Sha256::digest(&data));
        if actual != entry.oid.digest {
            fail(&mut entry, repo, format!("digest mismatch: fetched sha256:{actual}"));
            return Ok(entry);
        }
    }
    transition(&mut entry, RemediationStatus::Verified);

    let upload = retry
        .run("target put", || target.put(repo, &entry.oid, data.clone()))
        .await;
    match upload {
        Ok(()) => {}
        Err(error) if error.is_auth() => return Err(error),
        Err(error) => {
            fail(&mut entry, repo, format!("upload: {error}"));
            return Ok(entry);
        }
    }

    let confirmed = retry
        .run("target confirm", || target.exists(repo, &entry.oid))
        .await;
    match confirmed {
        Ok(true) => {
            tracing::info!(repo = %repo, oid = %entry.oid, size = entry.size, "copied object");
            transition(&mut entry, RemediationStatus::Uploaded);
        }
        Ok(false) => fail(&mut entry, repo, "not present after upload".to_string()),
        Err(error) if error.is_auth() => return Err(error),
        Err(error) => fail(&mut entry, repo, format!("confirm: {error}")),
    }
    Ok(entry)
}
