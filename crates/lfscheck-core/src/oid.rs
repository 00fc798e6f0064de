//! LFS object identifiers.
//!
//! An object is identified by its content hash alone. The declared size that
//! travels with it (see [`crate::ObjectRecord`]) is used for integrity checks
//! and is not part of identity.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Content hash algorithm of an LFS object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    Sha256,
}

impl HashAlgorithm {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }

    /// Length of the hex digest for this algorithm.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha256 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            other => Err(CoreError::InvalidOid {
                oid: other.to_string(),
                reason: format!("unsupported hash algorithm '{other}'"),
            }),
        }
    }
}

/// An LFS object id: algorithm plus lowercase hex digest.
///
/// Serialized as two fields, `algorithm` and `oid` (the bare digest), which is
/// the shape used by object map and remediation files.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct Oid {
    pub algorithm: HashAlgorithm,
    #[serde(rename = "oid")]
    pub digest: String,
}

impl Oid {
    /// Build an id from an algorithm and digest, validating the digest.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOid`] if the digest has the wrong length or
    /// contains anything other than lowercase hex.
    pub fn new(algorithm: HashAlgorithm, digest: impl Into<String>) -> Result<Self, CoreError> {
        let oid = Self {
            algorithm,
            digest: digest.into(),
        };
        oid.validate()?;
        Ok(oid)
    }

    /// Parse `<algorithm>:<hex-digest>`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOid`] for a missing `:`, unknown algorithm,
    /// or malformed digest.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let (algorithm, digest) = raw.split_once(':').ok_or_else(|| CoreError::InvalidOid {
            oid: raw.to_string(),
            reason: "expected <algorithm>:<hex-digest>".to_string(),
        })?;
        Self::new(algorithm.parse()?, digest)
    }

    /// Check the digest against the algorithm's expected shape.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOid`] when the digest is malformed.
    pub fn validate(&self) -> Result<(), CoreError> {
        let expected = self.algorithm.hex_len();
        if self.digest.len() != expected {
            return Err(CoreError::InvalidOid {
                oid: self.to_string(),
                reason: format!(
                    "digest must be {expected} hex characters, found {}",
                    self.digest.len()
                ),
            });
        }
        if !self
            .digest
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(CoreError::InvalidOid {
                oid: self.to_string(),
                reason: "digest must be lowercase hex".to_string(),
            });
        }
        Ok(())
    }

    /// Two-level hash-prefix shard: `ab/cd/abcd…`.
    #[must_use]
    pub fn shard_path(&self) -> String {
        let digest = &self.digest;
        match (digest.get(0..2), digest.get(2..4)) {
            (Some(first), Some(second)) => format!("{first}/{second}/{digest}"),
            _ => digest.clone(),
        }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest)
    }
}

impl FromStr for Oid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
