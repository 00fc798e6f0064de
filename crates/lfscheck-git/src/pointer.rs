//! LFS pointer file parsing.
//!
//! A pointer is a small UTF-8 text blob of `key value` lines, each ending in
//! `\n`. The first line is always `version <spec-url>`; the remaining keys
//! are sorted and unique, and must include `oid` and `size`. Optional
//! `ext-<N>-<name>` lines describe extensions and are kept for reference.

use std::fmt;

use lfscheck_core::{HashAlgorithm, Oid};
use thiserror::Error;

/// Accepted values of the `version` line.
pub const POINTER_VERSIONS: [&str; 2] = [
    "https://git-lfs.github.com/spec/v1",
    "https://hawser.github.com/spec/v1",
];

/// A parsed pointer file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerRecord {
    pub oid: Oid,
    pub size: u64,
    pub extensions: Vec<PointerExtension>,
}

/// An `ext-<priority>-<name> <algorithm>:<digest>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerExtension {
    pub priority: u32,
    pub name: String,
    pub oid: String,
}

/// Why a pointer-like blob was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerParseError {
    #[error("not valid UTF-8")]
    NotUtf8,
    #[error("missing trailing newline")]
    MissingTrailingNewline,
    #[error("line {line}: expected 'key value'")]
    MalformedLine { line: usize },
    #[error("first line must be 'version', found '{0}'")]
    MissingVersion(String),
    #[error("unsupported version '{0}'")]
    UnsupportedVersion(String),
    #[error("key '{key}' out of order or duplicated")]
    KeyOrder { key: String },
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("missing '{0}' line")]
    MissingKey(&'static str),
    #[error("invalid oid: {0}")]
    InvalidOid(String),
    #[error("invalid size '{0}'")]
    InvalidSize(String),
    #[error("invalid extension line '{0}'")]
    InvalidExtension(String),
}

impl fmt::Display for PointerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.oid, self.size)
    }
}

/// Cheap check for blobs that claim to be pointers.
///
/// Only blobs passing this check and then failing [`parse_pointer`] count as
/// malformed pointers; everything else is ordinary content.
#[must_use]
pub fn looks_like_pointer(data: &[u8]) -> bool {
    data.starts_with(b"version ") || data.split(|b| *b == b'\n').any(|line| line.starts_with(b"oid "))
}

/// Parse a pointer blob.
///
/// # Errors
///
/// Returns [`PointerParseError`] describing the first violation found.
pub fn parse_pointer(data: &[u8]) -> Result<PointerRecord, PointerParseError> {
    let text = std::str::from_utf8(data).map_err(|_| PointerParseError::NotUtf8)?;
    let body = text
        .strip_suffix('\n')
        .ok_or(PointerParseError::MissingTrailingNewline)?;

    let mut lines = body.split('\n').enumerate();
    let (_, first) = lines.next().ok_or(PointerParseError::MissingKey("version"))?;
    let (key, value) = split_line(first, 1)?;
    if key != "version" {
        return Err(PointerParseError::MissingVersion(key.to_string()));
    }
    if !POINTER_VERSIONS.contains(&value) {
        return Err(PointerParseError::UnsupportedVersion(value.to_string()));
    }

    let mut previous: Option<&str> = None;
    let mut oid = None;
    let mut size = None;
    let mut extensions = Vec::new();

    for (index, line) in lines {
        let (key, value) = split_line(line, index + 1)?;
        if previous.is_some_and(|prev| key <= prev) {
            return Err(PointerParseError::KeyOrder {
                key: key.to_string(),
            });
        }
        previous = Some(key);

        match key {
            "oid" => oid = Some(parse_oid(value)?),
            "size" => size = Some(parse_size(value)?),
            k if k.starts_with("ext-") => extensions.push(parse_extension(k, value)?),
            other => return Err(PointerParseError::UnknownKey(other.to_string())),
        }
    }

    Ok(PointerRecord {
        oid: oid.ok_or(PointerParseError::MissingKey("oid"))?,
        size: size.ok_or(PointerParseError::MissingKey("size"))?,
        extensions,
    })
}

fn split_line(line: &str, number: usize) -> Result<(&str, &str), PointerParseError> {
    match line.split_once(' ') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => Ok((key, value)),
        _ => Err(PointerParseError::MalformedLine { line: number }),
    }
}

fn parse_oid(value: &str) -> Result<Oid, PointerParseError> {
    let (algorithm, digest) = value
        .split_once(':')
        .ok_or_else(|| PointerParseError::InvalidOid(value.to_string()))?;
    let algorithm = algorithm
        .parse::<HashAlgorithm>()
        .map_err(|e| PointerParseError::InvalidOid(e.to_string()))?;
    Oid::new(algorithm, digest).map_err(|e| PointerParseError::InvalidOid(e.to_string()))
}

fn parse_size(value: &str) -> Result<u64, PointerParseError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PointerParseError::InvalidSize(value.to_string()));
    }
    value
        .parse()
        .map_err(|_| PointerParseError::InvalidSize(value.to_string()))
}

fn parse_extension(key: &str, value: &str) -> Result<PointerExtension, PointerParseError> {
    let invalid = || PointerParseError::InvalidExtension(format!("{key} {value}"));
    let rest = key.strip_prefix("ext-").ok_or_else(invalid)?;
    let (priority, name) = rest.split_once('-').ok_or_else(invalid)?;
    if priority.is_empty() || !priority.bytes().all(|b| b.is_ascii_digit()) || name.is_empty() {
        return Err(invalid());
    }
    if !value.contains(':') {
        return Err(invalid());
    }
    Ok(PointerExtension {
        priority: priority.parse().map_err(|_| invalid())?,
        name: name.to_string(),
        oid: value.to_string(),
    })
}
