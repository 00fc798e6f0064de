//! Object key layouts inside a bucket.
//!
//! Every layout is a pure function of the object id (and, for
//! [`KeyLayout::RepoScoped`], the repository), so uploads are idempotent.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::oid::Oid;
use crate::repo::RepoReference;

/// How an object id maps to a key in a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum KeyLayout {
    /// `<prefix>/ab/cd/abcd…` (two-level hash-prefix sharding).
    #[default]
    Sharded,
    /// `<prefix>/abcd…`
    Flat,
    /// `<prefix>/<owner>/<name>/abcd…`
    RepoScoped,
}

impl KeyLayout {
    /// Build the object key for `oid` under `prefix`.
    #[must_use]
    pub fn key(self, prefix: &str, repo: &RepoReference, oid: &Oid) -> String {
        let tail = match self {
            Self::Sharded => oid.shard_path(),
            Self::Flat => oid.digest.clone(),
            Self::RepoScoped => format!("{}/{}/{}", repo.owner, repo.name, oid.digest),
        };
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            tail
        } else {
            format!("{prefix}/{tail}")
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::oid::HashAlgorithm;

    fn oid() -> Oid {
        Oid::new(HashAlgorithm::Sha256, "ab".repeat(32)).unwrap()
    }

    #[test]
    fn sharded_layout_ignores_repository() {
        let a = KeyLayout::Sharded.key("", &RepoReference::new("o", "a"), &oid());
        let b = KeyLayout::Sharded.key("", &RepoReference::new("o", "b"), &oid());
        assert_eq!(a, b);
        assert_eq!(a, format!("ab/ab/{}", "ab".repeat(32)));
    }

    #[test]
    fn flat_layout_with_prefix() {
        let key = KeyLayout::Flat.key("data/", &RepoReference::new("o", "a"), &oid());
        assert_eq!(key, format!("data/{}", "ab".repeat(32)));
    }

    #[test]
    fn repo_scoped_layout_includes_owner_and_name() {
        let key = KeyLayout::RepoScoped.key("", &RepoReference::new("lsst", "afwdata"), &oid());
        assert_eq!(key, format!("lsst/afwdata/{}", "ab".repeat(32)));
    }
}
