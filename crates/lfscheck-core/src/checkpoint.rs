//! Checkpoint persistence.
//!
//! Object maps and remediation files are written via temp-then-rename, so a
//! file at its final path is always complete. Temp files start with `.` and
//! never match the default `oids--*.json` glob.

use std::fs;
use std::path::{Path, PathBuf};

use globset::Glob;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::object_map::{ObjectMap, ObjectMapFile};
use crate::remediation::RepoRemediation;
use crate::repo::RepoReference;

/// Default glob for object map files in a map directory.
pub const DEFAULT_MAP_GLOB: &str = "oids--*.json";

/// File name of the object map for `repo`.
#[must_use]
pub fn map_file_name(repo: &RepoReference) -> String {
    format!("oids--{}.json", repo.slug())
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
///
/// # Errors
///
/// Returns [`CoreError::Io`] if the parent directory, temp file, or rename
/// fails, and [`CoreError::Json`] if serialization fails.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| CoreError::InvalidCheckpoint {
            path: path.to_path_buf(),
            reason: "invalid file path for atomic write".to_string(),
        })?;

    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');

    let tmp = path.with_file_name(format!(
        ".{}.tmp.{}.{}",
        file_name,
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    fs::write(&tmp, body).map_err(|e| CoreError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(CoreError::io(path, e));
    }
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, CoreError> {
    let raw = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| CoreError::InvalidCheckpoint {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

impl ObjectMap {
    /// Persist this map as `<dir>/oids--<owner>--<name>.json`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if the write or rename fails.
    pub fn write_atomic(&self, dir: &Path) -> Result<PathBuf, CoreError> {
        let path = dir.join(map_file_name(&self.repo));
        write_json_atomic(&path, &self.to_file())?;
        tracing::debug!(repo = %self.repo, path = %path.display(), objects = self.len(), "wrote object map");
        Ok(path)
    }

    /// Load a persisted map.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCheckpoint`] if the file is not a valid
    /// object map, and [`CoreError::Io`] if it cannot be read.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let file: ObjectMapFile = read_json(path)?;
        Self::from_file(file).map_err(|e| CoreError::InvalidCheckpoint {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the persisted map for `repo` from `dir`, if a valid one exists.
    ///
    /// A present but unreadable file is logged and treated as absent, so the
    /// repository gets rescanned.
    #[must_use]
    pub fn load_existing(dir: &Path, repo: &RepoReference) -> Option<Self> {
        let path = dir.join(map_file_name(repo));
        if !path.is_file() {
            return None;
        }
        match Self::load(&path) {
            Ok(map) if map.repo.same_repo(repo) => Some(map),
            Ok(map) => {
                tracing::warn!(
                    path = %path.display(),
                    found = %map.repo,
                    expected = %repo,
                    "object map belongs to a different repository; ignoring"
                );
                None
            }
            Err(error) => {
                tracing::warn!(%error, "ignoring unusable object map");
                None
            }
        }
    }
}

/// Load every object map in `dir` whose file name matches `pattern`.
///
/// Maps are returned in file name order.
///
/// # Errors
///
/// Returns [`CoreError::InvalidGlob`] for a bad pattern, [`CoreError::Io`] if
/// the directory cannot be listed, and [`CoreError::InvalidCheckpoint`] for
/// any matching file that is not a valid map.
pub fn load_object_maps(dir: &Path, pattern: &str) -> Result<Vec<ObjectMap>, CoreError> {
    let matcher = Glob::new(pattern)
        .map_err(|source| CoreError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))? {
        let entry = entry.map_err(|e| CoreError::io(dir, e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') || !path.is_file() || !matcher.is_match(name) {
            continue;
        }
        paths.push(path);
    }
    paths.sort();

    paths.iter().map(|path| ObjectMap::load(path)).collect()
}

/// A remediation file: entries for one or more repositories.
///
/// Always written as a JSON array; a single repository document (not wrapped
/// in an array) is accepted on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RemediationFile {
    pub repos: Vec<RepoRemediation>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RemediationDocument {
    Many(Vec<RepoRemediation>),
    One(RepoRemediation),
}

impl RemediationFile {
    #[must_use]
    pub const fn new(repos: Vec<RepoRemediation>) -> Self {
        Self { repos }
    }

    /// Atomically write the file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if the write or rename fails.
    pub fn write_atomic(&self, path: &Path) -> Result<(), CoreError> {
        write_json_atomic(path, self)?;
        tracing::debug!(path = %path.display(), repos = self.repos.len(), "wrote remediation file");
        Ok(())
    }

    /// Load a remediation file, validating every object id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCheckpoint`] if the file is not a valid
    /// remediation document, and [`CoreError::Io`] if it cannot be read.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let repos = match read_json::<RemediationDocument>(path)? {
            RemediationDocument::Many(repos) => repos,
            RemediationDocument::One(repo) => vec![repo],
        };
        for entry in repos.iter().flat_map(|r| &r.objects) {
            entry.oid.validate().map_err(|e| CoreError::InvalidCheckpoint {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        Ok(Self { repos })
    }

    /// Total number of entries across repositories.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.repos.iter().map(|r| r.objects.len()).sum()
    }
}
