//! # lfscheck-core
//!
//! Core types, checkpoint files, and error types for lfscheck.
//!
//! This crate provides the foundational types shared across all lfscheck crates:
//! - Repository identity parsed from `https` URLs and repository list files
//! - LFS object identifiers (`sha256:<hex>`) and object records
//! - The per-repository object map produced by the mapping stage
//! - Remediation entries with their status state machine
//! - Storage key layouts shared by the source and target stores
//! - Checkpoint persistence (atomic JSON writes, map directory loading)
//! - Cross-cutting error types

pub mod checkpoint;
pub mod errors;
pub mod layout;
pub mod object_map;
pub mod oid;
pub mod remediation;
pub mod repo;

pub use errors::CoreError;
pub use layout::KeyLayout;
pub use object_map::{ObjectMap, ObjectRecord};
pub use oid::{HashAlgorithm, Oid};
pub use remediation::{RemediationEntry, RemediationStatus, RepoRemediation};
pub use repo::RepoReference;
