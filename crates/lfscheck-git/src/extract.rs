//! Pointer extraction from commit trees.
//!
//! Trees are walked straight from the object database; nothing is checked
//! out and no large-file content is fetched. Blobs above the pointer size
//! limit are skipped from their header alone. Each blob is classified once
//! per extractor, so a malformed pointer shared by many commits is counted
//! once.

use std::collections::{HashMap, HashSet};

use gix::ObjectId;
use gix::objs::tree::EntryKind;

use crate::error::GitError;
use crate::pointer::{PointerRecord, looks_like_pointer, parse_pointer};

/// A pointer found at a path in a commit tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundPointer {
    pub pointer: PointerRecord,
    pub path: String,
}

/// Result of extracting one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOutcome {
    pub found: Vec<FoundPointer>,
    /// Pointer-like blobs first seen in this commit that failed to parse.
    pub malformed: u64,
}

#[derive(Debug, Clone)]
enum BlobVerdict {
    Pointer(PointerRecord),
    Malformed,
    Content,
}

/// Walks commit trees and classifies blobs, caching verdicts across commits.
pub struct PointerExtractor<'repo> {
    repo: &'repo gix::Repository,
    max_size: u64,
    track_paths: bool,
    blobs: HashMap<ObjectId, BlobVerdict>,
    seen_trees: HashSet<ObjectId>,
}

impl<'repo> PointerExtractor<'repo> {
    #[must_use]
    pub fn new(repo: &'repo gix::Repository, max_size: u64) -> Self {
        Self {
            repo,
            max_size,
            track_paths: false,
            blobs: HashMap::new(),
            seen_trees: HashSet::new(),
        }
    }

    /// Report every path a pointer appears at.
    ///
    /// Without this, a subtree already walked for an earlier commit is not
    /// walked again, and only the first path of each pointer is reported.
    #[must_use]
    pub const fn track_paths(mut self, track: bool) -> Self {
        self.track_paths = track;
        self
    }

    /// Extract the pointers reachable from `commit`'s root tree.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::Object`] if the commit or one of its trees cannot
    /// be read.
    pub fn extract(&mut self, commit: ObjectId) -> Result<ExtractOutcome, GitError> {
        let commit = self
            .repo
            .find_commit(commit)
            .map_err(|e| GitError::object(commit, e))?;
        let root = commit
            .tree_id()
            .map_err(|e| GitError::object(commit.id, e))?
            .detach();

        let mut outcome = ExtractOutcome::default();
        let mut pending = vec![(root, String::new())];
        while let Some((tree_id, prefix)) = pending.pop() {
            if !self.seen_trees.insert(tree_id) && !self.track_paths {
                continue;
            }
            for (kind, name, id) in self.tree_entries(tree_id)? {
                let path = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                match kind {
                    EntryKind::Tree => pending.push((id, path)),
                    EntryKind::Blob | EntryKind::BlobExecutable => {
                        self.visit_blob(id, path, &mut outcome)?;
                    }
                    EntryKind::Link | EntryKind::Commit => {}
                }
            }
        }
        Ok(outcome)
    }

    fn tree_entries(&self, id: ObjectId) -> Result<Vec<(EntryKind, String, ObjectId)>, GitError> {
        let tree = self
            .repo
            .find_tree(id)
            .map_err(|e| GitError::object(id, e))?;
        let decoded = tree.decode().map_err(|e| GitError::object(id, e))?;
        Ok(decoded
            .entries
            .iter()
            .map(|entry| {
                (
                    entry.mode.kind(),
                    entry.filename.to_string(),
                    entry.oid.to_owned(),
                )
            })
            .collect())
    }

    fn visit_blob(
        &mut self,
        id: ObjectId,
        path: String,
        outcome: &mut ExtractOutcome,
    ) -> Result<(), GitError> {
        let verdict = if let Some(verdict) = self.blobs.get(&id) {
            verdict.clone()
        } else {
            let verdict = self.classify(id, &path)?;
            if matches!(verdict, BlobVerdict::Malformed) {
                outcome.malformed += 1;
            }
            self.blobs.insert(id, verdict.clone());
            verdict
        };
        if let BlobVerdict::Pointer(pointer) = verdict {
            tracing::debug!(oid = %pointer.oid, %path, "found pointer");
            outcome.found.push(FoundPointer { pointer, path });
        }
        Ok(())
    }

    fn classify(&self, id: ObjectId, path: &str) -> Result<BlobVerdict, GitError> {
        let header = self
            .repo
            .find_header(id)
            .map_err(|e| GitError::object(id, e))?;
        if header.size() > self.max_size {
            return Ok(BlobVerdict::Content);
        }
        let object = self
            .repo
            .find_object(id)
            .map_err(|e| GitError::object(id, e))?;
        if !looks_like_pointer(&object.data) {
            return Ok(BlobVerdict::Content);
        }
        match parse_pointer(&object.data) {
            Ok(pointer) => Ok(BlobVerdict::Pointer(pointer)),
            Err(error) => {
                tracing::warn!(blob = %id, %path, %error, "malformed pointer file");
                Ok(BlobVerdict::Malformed)
            }
        }
    }
}

/// Extract the pointers of a single commit with a fresh extractor.
///
/// # Errors
///
/// See [`PointerExtractor::extract`].
pub fn extract_pointers(
    repo: &gix::Repository,
    commit: ObjectId,
    max_size: u64,
) -> Result<ExtractOutcome, GitError> {
    PointerExtractor::new(repo, max_size)
        .track_paths(true)
        .extract(commit)
}
