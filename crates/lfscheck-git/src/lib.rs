//! # lfscheck-git
//!
//! Ref selection and LFS pointer extraction for lfscheck.
//!
//! Uses `gix` (pure Rust git implementation) for:
//! - Listing tags and branches and peeling them to commits
//! - Walking commit trees straight from the object database
//! - Reading candidate pointer blobs without a worktree checkout
//!
//! The `git` CLI is only used to create bare clones (under `tokio::process`,
//! with a timeout).
//!
//! This crate isolates the `gix` dependency from the rest of the workspace,
//! so compile time impact is limited to this crate only.

pub mod clone;
pub mod error;
pub mod extract;
pub mod pointer;
pub mod refs;
pub mod scan;

pub use clone::{CloneOptions, checkout_path, clone_bare, ensure_checkout};
pub use error::GitError;
pub use extract::{ExtractOutcome, FoundPointer, PointerExtractor, extract_pointers};
pub use pointer::{PointerParseError, PointerRecord, looks_like_pointer, parse_pointer};
pub use refs::{RefSelection, RefSelectorConfig, choose_refs, select_refs};
pub use scan::{ScanOptions, scan_repository};
