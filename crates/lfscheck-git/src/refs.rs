//! Selection of the git references whose trees are scanned.
//!
//! Every tag is selected, plus one default branch (`main`, else `master`)
//! and every branch whose short name matches the configured pattern. Refs
//! are kept under their full names, so a tag and a branch that share a short
//! name stay two independent refs.

use std::collections::{BTreeMap, BTreeSet};

use gix::ObjectId;
use regex::Regex;

use crate::error::GitError;

const TAG_PREFIX: &str = "refs/tags/";
const LOCAL_PREFIX: &str = "refs/heads/";
const REMOTE_PREFIX: &str = "refs/remotes/";

/// Default branch names, most preferred first.
pub const DEFAULT_BRANCHES: [&str; 2] = ["main", "master"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RefKind {
    Tag,
    LocalBranch,
    RemoteBranch,
}

/// A reference resolved to the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefCandidate {
    /// Full name, e.g. `refs/remotes/origin/v1.x`.
    pub name: String,
    pub kind: RefKind,
    /// Name used for matching: the tag or branch name without remote.
    pub short: String,
    pub commit: ObjectId,
}

impl RefCandidate {
    /// Classify a full reference name. Returns `None` for refs that are not
    /// tags or branches, and for symbolic `<remote>/HEAD` refs.
    #[must_use]
    pub fn classify(name: &str, commit: ObjectId) -> Option<Self> {
        let (kind, short) = if let Some(tag) = name.strip_prefix(TAG_PREFIX) {
            (RefKind::Tag, tag)
        } else if let Some(branch) = name.strip_prefix(LOCAL_PREFIX) {
            (RefKind::LocalBranch, branch)
        } else if let Some(remote) = name.strip_prefix(REMOTE_PREFIX) {
            let (_, branch) = remote.split_once('/')?;
            if branch == "HEAD" {
                return None;
            }
            (RefKind::RemoteBranch, branch)
        } else {
            return None;
        };
        if short.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            kind,
            short: short.to_string(),
            commit,
        })
    }

    const fn is_branch(&self) -> bool {
        matches!(self.kind, RefKind::LocalBranch | RefKind::RemoteBranch)
    }
}

/// Branch selection pattern.
#[derive(Debug, Clone)]
pub struct RefSelectorConfig {
    pattern: Regex,
}

impl RefSelectorConfig {
    /// Compile `pattern`, anchoring it at the start of the branch name.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::InvalidPattern`] if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self, GitError> {
        let anchored = if pattern.starts_with('^') {
            pattern.to_string()
        } else {
            format!("^(?:{pattern})")
        };
        let pattern = Regex::new(&anchored).map_err(|source| GitError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { pattern })
    }

    #[must_use]
    pub fn matches(&self, branch: &str) -> bool {
        self.pattern.is_match(branch)
    }
}

/// One selected reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedRef {
    pub name: String,
    pub commit: ObjectId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefSelection {
    pub refs: Vec<SelectedRef>,
    /// Short name of the chosen default branch.
    pub default_branch: Option<String>,
    pub notes: Vec<String>,
}

impl RefSelection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Full names of the selected refs.
    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        self.refs.iter().map(|r| r.name.clone()).collect()
    }

    /// Selected refs grouped by commit, so each commit is scanned once.
    #[must_use]
    pub fn commits(&self) -> BTreeMap<ObjectId, Vec<String>> {
        let mut grouped: BTreeMap<ObjectId, Vec<String>> = BTreeMap::new();
        for selected in &self.refs {
            grouped
                .entry(selected.commit)
                .or_default()
                .push(selected.name.clone());
        }
        grouped
    }
}

/// Refs standing for one branch name: the local branch if there is one,
/// otherwise every remote branch with a distinct commit.
fn branch_heads(mut refs: Vec<RefCandidate>) -> Vec<RefCandidate> {
    refs.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
    let mut kept: Vec<RefCandidate> = Vec::new();
    for candidate in refs {
        let winner = kept
            .iter()
            .find(|k| k.kind == RefKind::LocalBranch || k.commit == candidate.commit);
        match winner {
            Some(winner) if winner.commit != candidate.commit => {
                tracing::debug!(
                    kept = %winner.name,
                    dropped = %candidate.name,
                    "local branch shadows a diverged remote branch"
                );
            }
            Some(_) => {}
            None => kept.push(candidate),
        }
    }
    kept
}

/// Pick the refs to scan from a list of candidates.
///
/// When a branch exists both locally and on a remote, the local ref wins.
/// Remote branches of the same name on different commits are all kept.
#[must_use]
pub fn choose_refs(candidates: Vec<RefCandidate>, config: &RefSelectorConfig) -> RefSelection {
    let mut tags = Vec::new();
    let mut by_short: BTreeMap<String, Vec<RefCandidate>> = BTreeMap::new();

    for candidate in candidates {
        if candidate.is_branch() {
            by_short.entry(candidate.short.clone()).or_default().push(candidate);
        } else {
            tags.push(candidate);
        }
    }
    let branches: BTreeMap<String, Vec<RefCandidate>> = by_short
        .into_iter()
        .map(|(short, refs)| (short, branch_heads(refs)))
        .collect();

    let mut selection = RefSelection::default();
    let default_branch = DEFAULT_BRANCHES
        .iter()
        .find(|name| branches.contains_key(**name))
        .map(|name| (*name).to_string());
    if default_branch.is_none() {
        selection
            .notes
            .push(String::from("no default branch (main or master) found"));
    }

    for (short, heads) in &branches {
        let is_default = default_branch.as_deref() == Some(short.as_str());
        if is_default || config.matches(short) {
            selection.refs.extend(heads.iter().map(|head| SelectedRef {
                name: head.name.clone(),
                commit: head.commit,
            }));
        }
    }
    selection.refs.extend(tags.into_iter().map(|tag| SelectedRef {
        name: tag.name,
        commit: tag.commit,
    }));
    selection.refs.sort_by(|a, b| a.name.cmp(&b.name));
    selection.default_branch = default_branch;
    selection
}

/// List tags and branches of `repo`, each peeled to its commit.
///
/// # Errors
///
/// Returns [`GitError::References`] if the reference database cannot be read.
pub fn list_refs(repo: &gix::Repository) -> Result<Vec<RefCandidate>, GitError> {
    let platform = repo
        .references()
        .map_err(|e| GitError::References(e.to_string()))?;
    let iter = platform
        .all()
        .map_err(|e| GitError::References(e.to_string()))?;

    let mut candidates = Vec::new();
    for reference in iter {
        let mut reference = reference.map_err(|e| GitError::References(e.to_string()))?;
        let name = reference.name().as_bstr().to_string();
        if !(name.starts_with(TAG_PREFIX)
            || name.starts_with(LOCAL_PREFIX)
            || name.starts_with(REMOTE_PREFIX))
        {
            continue;
        }
        let id = match reference.peel_to_id_in_place() {
            Ok(id) => id.detach(),
            Err(error) => {
                tracing::warn!(reference = %name, %error, "cannot resolve reference; skipping");
                continue;
            }
        };
        let is_commit = repo
            .find_header(id)
            .is_ok_and(|header| header.kind() == gix::object::Kind::Commit);
        if !is_commit {
            tracing::debug!(reference = %name, "reference does not point at a commit; skipping");
            continue;
        }
        if let Some(candidate) = RefCandidate::classify(&name, id) {
            candidates.push(candidate);
        }
    }
    Ok(candidates)
}

/// List and select the refs of `repo`.
///
/// # Errors
///
/// Returns [`GitError::References`] if the reference database cannot be read.
pub fn select_refs(
    repo: &gix::Repository,
    config: &RefSelectorConfig,
) -> Result<RefSelection, GitError> {
    let selection = choose_refs(list_refs(repo)?, config);
    tracing::debug!(
        refs = selection.refs.len(),
        default_branch = ?selection.default_branch,
        "selected refs"
    );
    Ok(selection)
}
