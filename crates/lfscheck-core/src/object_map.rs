//! Per-repository object map.
//!
//! The object map is the checkpoint between the mapping stage and the
//! checking stage: the set of LFS objects (unique by [`Oid`]) referenced by
//! the scanned refs of one repository.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::oid::Oid;
use crate::repo::RepoReference;

/// Current object map file format.
pub const OBJECT_MAP_FORMAT_VERSION: u32 = 1;

const fn default_format_version() -> u32 {
    OBJECT_MAP_FORMAT_VERSION
}

/// One LFS object referenced by a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectRecord {
    #[serde(flatten)]
    pub oid: Oid,

    /// Size in bytes declared by the pointer file.
    pub size: u64,

    /// Refs in which the pointer was found (full map only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,

    /// Paths at which the pointer was found (full map only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

impl ObjectRecord {
    #[must_use]
    pub const fn new(oid: Oid, size: u64) -> Self {
        Self {
            oid,
            size,
            refs: Vec::new(),
            paths: Vec::new(),
        }
    }

    fn merge_locations(&mut self, other: Self) {
        let refs = self.refs.drain(..).chain(other.refs).collect::<BTreeSet<_>>();
        let paths = self
            .paths
            .drain(..)
            .chain(other.paths)
            .collect::<BTreeSet<_>>();
        self.refs = refs.into_iter().collect();
        self.paths = paths.into_iter().collect();
    }
}

/// The objects referenced by one repository, plus scan metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMap {
    pub repo: RepoReference,
    pub refs_scanned: BTreeSet<String>,
    pub scanned_at: DateTime<Utc>,
    /// Blobs that looked like pointer files but failed to parse.
    pub malformed_pointers: u64,
    pub notes: Vec<String>,
    objects: BTreeMap<Oid, ObjectRecord>,
}

impl ObjectMap {
    /// Create an empty map for `repo`, stamped with the current time.
    #[must_use]
    pub fn new(repo: RepoReference) -> Self {
        Self {
            repo,
            refs_scanned: BTreeSet::new(),
            scanned_at: Utc::now(),
            malformed_pointers: 0,
            notes: Vec::new(),
            objects: BTreeMap::new(),
        }
    }

    /// Insert a record, deduplicating by object id.
    ///
    /// Returns `true` if the id was not present. When it was, ref and path
    /// locations are merged; the first declared size wins and a conflicting
    /// size is logged.
    pub fn insert(&mut self, record: ObjectRecord) -> bool {
        if let Some(existing) = self.objects.get_mut(&record.oid) {
            if existing.size != record.size {
                tracing::warn!(
                    repo = %self.repo,
                    oid = %record.oid,
                    kept = existing.size,
                    ignored = record.size,
                    "conflicting declared sizes for the same object"
                );
            }
            existing.merge_locations(record);
            return false;
        }
        self.objects.insert(record.oid.clone(), record);
        true
    }

    /// Number of distinct objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[must_use]
    pub fn get(&self, oid: &Oid) -> Option<&ObjectRecord> {
        self.objects.get(oid)
    }

    /// Records in object id order.
    pub fn records(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.objects.values()
    }

    /// Owned records in object id order.
    #[must_use]
    pub fn to_records(&self) -> Vec<ObjectRecord> {
        self.objects.values().cloned().collect()
    }

    /// Convert into the persisted document shape.
    #[must_use]
    pub fn to_file(&self) -> ObjectMapFile {
        ObjectMapFile {
            format_version: OBJECT_MAP_FORMAT_VERSION,
            repo_owner: self.repo.owner.clone(),
            repo_name: self.repo.name.clone(),
            repo_url: self.repo.url.clone(),
            refs_scanned: self.refs_scanned.iter().cloned().collect(),
            scanned_at: self.scanned_at,
            malformed_pointers: self.malformed_pointers,
            notes: self.notes.clone(),
            objects: self.to_records(),
        }
    }

    /// Rebuild a map from its persisted document, validating every id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOid`] if any record has a malformed digest.
    pub fn from_file(file: ObjectMapFile) -> Result<Self, CoreError> {
        let mut map = Self {
            repo: RepoReference {
                owner: file.repo_owner,
                name: file.repo_name,
                url: file.repo_url,
            },
            refs_scanned: file.refs_scanned.into_iter().collect(),
            scanned_at: file.scanned_at,
            malformed_pointers: file.malformed_pointers,
            notes: file.notes,
            objects: BTreeMap::new(),
        };
        for record in file.objects {
            record.oid.validate()?;
            map.insert(record);
        }
        Ok(map)
    }
}

/// On-disk shape of an object map (`oids--<owner>--<name>.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMapFile {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub repo_owner: String,
    pub repo_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    pub refs_scanned: Vec<String>,
    pub scanned_at: DateTime<Utc>,
    #[serde(default)]
    pub malformed_pointers: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    pub objects: Vec<ObjectRecord>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::oid::HashAlgorithm;

    fn oid(fill: char) -> Oid {
        Oid::new(HashAlgorithm::Sha256, fill.to_string().repeat(64)).unwrap()
    }

    #[test]
    fn insert_deduplicates_by_oid() {
        let mut map = ObjectMap::new(RepoReference::new("lsst", "afwdata"));
        assert!(map.insert(ObjectRecord::new(oid('a'), 42)));
        assert!(!map.insert(ObjectRecord::new(oid('a'), 42)));
        assert!(map.insert(ObjectRecord::new(oid('b'), 7)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn first_declared_size_wins_and_locations_merge() {
        let mut map = ObjectMap::new(RepoReference::new("lsst", "afwdata"));
        let mut first = ObjectRecord::new(oid('a'), 42);
        first.refs = vec!["refs/tags/v1.0".into()];
        let mut second = ObjectRecord::new(oid('a'), 43);
        second.refs = vec!["refs/heads/main".into(), "refs/tags/v1.0".into()];

        map.insert(first);
        map.insert(second);

        let record = map.get(&oid('a')).unwrap();
        assert_eq!(record.size, 42);
        assert_eq!(record.refs, vec!["refs/heads/main", "refs/tags/v1.0"]);
    }

    #[test]
    fn file_roundtrip_preserves_map() {
        let mut map = ObjectMap::new(RepoReference::new("lsst", "afwdata"));
        map.refs_scanned.insert("refs/tags/v1.0".into());
        map.malformed_pointers = 2;
        map.notes.push("no main or master branch".into());
        map.insert(ObjectRecord::new(oid('c'), 1));
        map.insert(ObjectRecord::new(oid('a'), 2));

        let json = serde_json::to_string_pretty(&map.to_file()).unwrap();
        let file: ObjectMapFile = serde_json::from_str(&json).unwrap();
        let restored = ObjectMap::from_file(file).unwrap();
        assert_eq!(restored, map);
    }

    #[test]
    fn from_file_rejects_malformed_digest() {
        let mut file = ObjectMap::new(RepoReference::new("o", "r")).to_file();
        file.objects.push(ObjectRecord::new(
            Oid {
                algorithm: HashAlgorithm::Sha256,
                digest: "xyz".into(),
            },
            1,
        ));
        assert!(ObjectMap::from_file(file).is_err());
    }
}
