//! Repository identity and repository list files.
//!
//! A repository is identified by the final two path segments of its `https`
//! URL (`https://github.com/<owner>/<name>`). Repository list files hold one
//! URL per line; `#` starts a comment and a trailing `.git` is ignored.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Identity of one repository being audited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct RepoReference {
    /// Owner (usually an organization).
    pub owner: String,
    /// Repository name, without a `.git` suffix.
    pub name: String,
    /// Source URL, when the repository came from a repository list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl RepoReference {
    /// Build a reference from an explicit owner and name (no URL).
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            url: None,
        }
    }

    /// Parse an `https` repository URL.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRepoUrl`] if the scheme is not `https`, the
    /// host is missing, or the path has fewer than two segments.
    pub fn from_url(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        let invalid = |reason: String| CoreError::InvalidRepoUrl {
            url: trimmed.to_string(),
            reason,
        };

        let (scheme, rest) = trimmed
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme".to_string()))?;
        if !scheme.eq_ignore_ascii_case("https") {
            return Err(invalid(format!("scheme must be 'https', not '{scheme}'")));
        }

        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        if host.is_empty() {
            return Err(invalid("missing host".to_string()));
        }

        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>();
        let [.., owner, name] = segments.as_slice() else {
            return Err(invalid("path must end in <owner>/<name>".to_string()));
        };
        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            return Err(invalid("empty repository name".to_string()));
        }

        let url = trimmed.trim_end_matches('/');
        let url = url.strip_suffix(".git").unwrap_or(url);

        Ok(Self {
            owner: (*owner).to_string(),
            name: name.to_string(),
            url: Some(url.to_string()),
        })
    }

    /// `<owner>--<name>`, used in checkpoint file names.
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{}--{}", self.owner, self.name)
    }

    /// Whether two references name the same repository, ignoring the URL.
    #[must_use]
    pub fn same_repo(&self, other: &Self) -> bool {
        self.owner == other.owner && self.name == other.name
    }
}

impl fmt::Display for RepoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A line of a repository list that was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line_number: usize,
    pub content: String,
    pub reason: String,
}

/// Parsed repository list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoList {
    pub repos: Vec<RepoReference>,
    pub skipped: Vec<SkippedLine>,
}

/// Parse the text of a repository list.
///
/// Invalid lines are not fatal: they are logged and returned in
/// [`RepoList::skipped`]. Duplicate repositories are kept once, in the order
/// they first appear.
#[must_use]
pub fn parse_repo_list(text: &str) -> RepoList {
    let mut list = RepoList::default();
    let mut seen = HashSet::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        let line = line.strip_suffix(".git").unwrap_or(line);
        if line.is_empty() {
            continue;
        }

        match RepoReference::from_url(line) {
            Ok(repo) => {
                if seen.insert((repo.owner.clone(), repo.name.clone())) {
                    list.repos.push(repo);
                } else {
                    tracing::debug!(repo = %repo, "duplicate repository in list; ignoring");
                }
            }
            Err(error) => {
                tracing::warn!(line = index + 1, %error, "skipping repository list entry");
                list.skipped.push(SkippedLine {
                    line_number: index + 1,
                    content: line.to_string(),
                    reason: error.to_string(),
                });
            }
        }
    }

    list
}

/// Read and parse a repository list file.
///
/// # Errors
///
/// Returns [`CoreError::Io`] if the file cannot be read.
pub fn read_repo_list(path: &Path) -> Result<RepoList, CoreError> {
    let text = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    Ok(parse_repo_list(&text))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn owner_and_name_are_last_two_segments() {
        let repo = RepoReference::from_url("https://github.com/lsst/afwdata").unwrap();
        assert_eq!(repo.owner, "lsst");
        assert_eq!(repo.name, "afwdata");
        assert_eq!(repo.url.as_deref(), Some("https://github.com/lsst/afwdata"));
    }

    #[test]
    fn git_suffix_and_trailing_slash_are_dropped() {
        let repo = RepoReference::from_url("https://example.org/a/b/lsst-dm/milestones.git/")
            .unwrap();
        assert_eq!(repo.owner, "lsst-dm");
        assert_eq!(repo.name, "milestones");
        assert_eq!(
            repo.url.as_deref(),
            Some("https://example.org/a/b/lsst-dm/milestones")
        );
    }

    #[test]
    fn non_https_scheme_is_rejected() {
        let err = RepoReference::from_url("git@github.com:lsst/afwdata.git").unwrap_err();
        assert!(matches!(err, CoreError::InvalidRepoUrl { .. }));

        let err = RepoReference::from_url("http://github.com/lsst/afwdata").unwrap_err();
        assert!(err.to_string().contains("'http'"));
    }

    #[test]
    fn single_segment_path_is_rejected() {
        assert!(RepoReference::from_url("https://github.com/lsst").is_err());
        assert!(RepoReference::from_url("https:///lsst/afwdata").is_err());
    }

    #[test]
    fn list_parsing_handles_comments_blanks_and_bad_schemes() {
        let text = "\
# LFS repositories
https://github.com/lsst/afwdata.git   # primary

http://github.com/lsst/insecure
https://github.com/lsst-dm/milestones
https://github.com/lsst/afwdata
";
        let list = parse_repo_list(text);
        let names = list
            .repos
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["lsst/afwdata", "lsst-dm/milestones"]);
        assert_eq!(list.skipped.len(), 1);
        assert_eq!(list.skipped[0].line_number, 4);
    }

    #[test]
    fn missing_list_file_is_an_io_error() {
        let err = read_repo_list(Path::new("/nonexistent/lfsrepos.txt")).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
