//! Whole-repository mapping: refs in, [`ObjectMap`] out.

use std::path::Path;

use lfscheck_core::{ObjectMap, ObjectRecord, RepoReference};

use crate::error::GitError;
use crate::extract::PointerExtractor;
use crate::refs::{RefSelectorConfig, select_refs};

/// Options for [`scan_repository`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub selector: RefSelectorConfig,
    pub max_pointer_size: u64,
    /// Record refs and paths on every object.
    pub full_map: bool,
}

impl ScanOptions {
    /// # Errors
    ///
    /// Returns [`GitError::InvalidPattern`] if `branch_pattern` does not compile.
    pub fn new(branch_pattern: &str, max_pointer_size: u64, full_map: bool) -> Result<Self, GitError> {
        Ok(Self {
            selector: RefSelectorConfig::new(branch_pattern)?,
            max_pointer_size,
            full_map,
        })
    }
}

/// Build the object map of the checkout at `path`.
///
/// # Errors
///
/// Returns [`GitError::NotGitRepo`] if `path` is not a readable repository,
/// [`GitError::NoRefsSelected`] if no tag or branch qualifies, and other
/// [`GitError`] variants if the object database cannot be read.
pub fn scan_repository(
    path: &Path,
    repo_ref: &RepoReference,
    options: &ScanOptions,
) -> Result<ObjectMap, GitError> {
    let repo = gix::open(path).map_err(|_| GitError::NotGitRepo(path.to_path_buf()))?;
    let selection = select_refs(&repo, &options.selector)?;
    if selection.is_empty() {
        return Err(GitError::NoRefsSelected(repo_ref.to_string()));
    }

    let mut map = ObjectMap::new(repo_ref.clone());
    map.refs_scanned = selection.names();
    map.notes.extend(selection.notes.iter().cloned());

    let mut extractor =
        PointerExtractor::new(&repo, options.max_pointer_size).track_paths(options.full_map);
    let commits = selection.commits();
    for (commit, refs) in &commits {
        let outcome = extractor.extract(*commit)?;
        tracing::debug!(
            repo = %repo_ref,
            %commit,
            refs = ?refs,
            pointers = outcome.found.len(),
            "scanned commit"
        );
        map.malformed_pointers += outcome.malformed;
        for found in outcome.found {
            let mut record = ObjectRecord::new(found.pointer.oid, found.pointer.size);
            if options.full_map {
                record.refs.clone_from(refs);
                record.paths = vec![found.path];
            }
            map.insert(record);
        }
    }

    if map.malformed_pointers > 0 {
        tracing::warn!(
            repo = %repo_ref,
            malformed = map.malformed_pointers,
            "repository contains malformed pointer files"
        );
    }
    tracing::info!(
        repo = %repo_ref,
        refs = map.refs_scanned.len(),
        commits = commits.len(),
        objects = map.len(),
        "mapped repository"
    );
    Ok(map)
}
