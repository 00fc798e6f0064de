//! Test stores: an in-memory `CloudStore` and a scripted fault injector.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lfscheck_core::{HashAlgorithm, KeyLayout, ObjectRecord, Oid, RepoReference};
use lfscheck_store::{CloudStore, LfsStore, RetryPolicy, StoreError};
use object_store::memory::InMemory;

pub fn oid(fill: char) -> Oid {
    Oid::new(HashAlgorithm::Sha256, fill.to_string().repeat(64)).unwrap()
}

pub fn record(fill: char, size: u64) -> ObjectRecord {
    ObjectRecord::new(oid(fill), size)
}

pub fn repo() -> RepoReference {
    RepoReference::new("lsst", "afwdata")
}

pub fn memory_store(name: &str) -> CloudStore {
    CloudStore::new(
        name,
        Arc::new(InMemory::new()),
        "",
        KeyLayout::Sharded,
        Duration::from_secs(5),
    )
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
    }
}

/// Which call a fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Exists,
    Get,
    Put,
}

/// Wraps a store and injects errors for chosen (operation, object) pairs.
///
/// Each scripted fault is returned for its first `times` calls, then the
/// call goes through to the wrapped store.
pub struct FaultyStore<S> {
    inner: S,
    faults: Mutex<HashMap<(Op, String), (usize, StoreError)>>,
    puts: AtomicUsize,
    gets: AtomicUsize,
}

impl<S: LfsStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashMap::new()),
            puts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
        }
    }

    pub fn fail(self, op: Op, oid: &Oid, times: usize, error: StoreError) -> Self {
        self.faults
            .lock()
            .unwrap()
            .insert((op, oid.digest.clone()), (times, error));
        self
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn injected(&self, op: Op, oid: &Oid) -> Option<StoreError> {
        let mut faults = self.faults.lock().unwrap();
        let (remaining, error) = faults.get_mut(&(op, oid.digest.clone()))?;
        if *remaining == 0 {
            return None;
        }
        *remaining -= 1;
        Some(error.clone())
    }
}

impl<S: LfsStore> LfsStore for FaultyStore<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn exists(&self, repo: &RepoReference, oid: &Oid) -> Result<bool, StoreError> {
        if let Some(error) = self.injected(Op::Exists, oid) {
            return Err(error);
        }
        self.inner.exists(repo, oid).await
    }

    async fn get(&self, repo: &RepoReference, oid: &Oid) -> Result<Vec<u8>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.injected(Op::Get, oid) {
            return Err(error);
        }
        self.inner.get(repo, oid).await
    }

    async fn put(&self, repo: &RepoReference, oid: &Oid, data: Vec<u8>) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.injected(Op::Put, oid) {
            return Err(error);
        }
        self.inner.put(repo, oid, data).await
    }
}

pub fn transient() -> StoreError {
    StoreError::Transient {
        store: "test".into(),
        reason: "503 Slow Down".into(),
    }
}

pub fn auth() -> StoreError {
    StoreError::Auth {
        store: "test".into(),
        reason: "token expired".into(),
    }
}

pub fn permanent() -> StoreError {
    StoreError::Permanent {
        store: "test".into(),
        reason: "bad request".into(),
    }
}
