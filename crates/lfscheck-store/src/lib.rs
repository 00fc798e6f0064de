//! # lfscheck-store
//!
//! Source and target LFS object stores for lfscheck.
//!
//! - [`LfsStore`]: the `exists` / `get` / `put` seam, implemented over
//!   `object_store` by [`CloudStore`] (S3, GCS, local filesystem, in-memory)
//! - [`RetryPolicy`]: capped exponential backoff for transient failures
//! - [`ExistenceChecker`]: bounded-concurrency presence checks
//! - [`RemediationEngine`]: fetch, verify, upload and confirm missing objects
//!
//! Authorization failures are never retried and abort the calling stage, so
//! a run can be resumed under different credentials from its checkpoints.

pub mod checker;
pub mod client;
pub mod error;
pub mod remediate;
pub mod retry;

pub use checker::{CheckFailure, CheckOutcome, ExistenceChecker};
pub use client::{CloudStore, LfsStore};
pub use error::StoreError;
pub use remediate::{RemediationEngine, RemediationOptions};
pub use retry::RetryPolicy;
