//! Object store configuration for the source and target buckets.
//!
//! Credentials are never part of this config: they are resolved from the
//! process environment by the store SDK (`AWS_*`, `GOOGLE_*`).

use std::fmt;
use std::path::PathBuf;

use lfscheck_core::KeyLayout;
use serde::{Deserialize, Serialize};

/// Storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreProvider {
    S3,
    Gcs,
    Local,
    Memory,
}

impl StoreProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Gcs => "gcs",
            Self::Local => "local",
            Self::Memory => "memory",
        }
    }

    /// Whether the provider addresses a named cloud bucket.
    #[must_use]
    pub const fn needs_bucket(self) -> bool {
        matches!(self, Self::S3 | Self::Gcs)
    }
}

impl fmt::Display for StoreProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub provider: StoreProvider,

    /// Bucket name (`s3`, `gcs`).
    #[serde(default)]
    pub bucket: String,

    /// Root directory (`local`).
    #[serde(default)]
    pub root: String,

    /// Key prefix inside the bucket.
    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub layout: KeyLayout,
}

impl StoreConfig {
    /// Default migration target: the GCS bucket objects are copied into.
    #[must_use]
    pub fn default_target() -> Self {
        Self {
            provider: StoreProvider::Gcs,
            bucket: String::from("rubin-us-central1-git-lfs"),
            root: String::new(),
            prefix: String::new(),
            layout: KeyLayout::Sharded,
        }
    }

    /// Default migration source: the original S3 LFS bucket.
    #[must_use]
    pub fn default_source() -> Self {
        Self {
            provider: StoreProvider::S3,
            bucket: String::from("git-lfs.lsst.codes-us-west-2"),
            root: String::new(),
            prefix: String::new(),
            layout: KeyLayout::Sharded,
        }
    }

    /// Local root directory, if set.
    #[must_use]
    pub fn root(&self) -> Option<PathBuf> {
        if self.root.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.root))
        }
    }

    /// Human-readable location, used in logs and reports.
    #[must_use]
    pub fn describe(&self) -> String {
        let location = match self.provider {
            StoreProvider::S3 | StoreProvider::Gcs => self.bucket.clone(),
            StoreProvider::Local => self.root.clone(),
            StoreProvider::Memory => String::from("memory"),
        };
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}://{location}", self.provider)
        } else {
            format!("{}://{location}/{prefix}", self.provider)
        }
    }

    /// Check the fields required by the provider.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        match self.provider {
            StoreProvider::S3 | StoreProvider::Gcs => !self.bucket.trim().is_empty(),
            StoreProvider::Local => self.root().is_some(),
            StoreProvider::Memory => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_target_is_gcs_bucket() {
        let config = StoreConfig::default_target();
        assert_eq!(config.provider, StoreProvider::Gcs);
        assert!(config.is_configured());
        assert_eq!(config.describe(), "gcs://rubin-us-central1-git-lfs");
    }

    #[test]
    fn default_source_is_s3_bucket() {
        let config = StoreConfig::default_source();
        assert_eq!(config.provider, StoreProvider::S3);
        assert_eq!(config.layout, KeyLayout::Sharded);
    }

    #[test]
    fn cloud_provider_without_bucket_is_not_configured() {
        let config = StoreConfig {
            bucket: String::new(),
            ..StoreConfig::default_source()
        };
        assert!(!config.is_configured());
    }

    #[test]
    fn local_provider_needs_root() {
        let mut config = StoreConfig {
            provider: StoreProvider::Local,
            ..StoreConfig::default_target()
        };
        assert!(!config.is_configured());
        config.root = String::from("/srv/lfs");
        config.prefix = String::from("data/");
        assert!(config.is_configured());
        assert_eq!(config.describe(), "local:///srv/lfs/data");
    }
}
