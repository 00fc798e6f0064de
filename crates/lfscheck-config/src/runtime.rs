//! Concurrency, batching and retry settings for the store-facing stages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_check_concurrency() -> usize {
    16
}

const fn default_batch_size() -> usize {
    100
}

const fn default_remediate_concurrency() -> usize {
    8
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_initial_backoff_ms() -> u64 {
    200
}

const fn default_max_backoff_ms() -> u64 {
    10_000
}

const fn default_op_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckConfig {
    /// Existence checks in flight at once.
    #[serde(default = "default_check_concurrency")]
    pub concurrency: usize,

    /// Objects submitted per batch; bounds memory for very large maps.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            concurrency: default_check_concurrency(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemediateConfig {
    /// Objects copied concurrently.
    #[serde(default = "default_remediate_concurrency")]
    pub concurrency: usize,

    /// Report what would be copied without writing to the target.
    #[serde(default)]
    pub dry_run: bool,

    /// Hash fetched content and compare it to the object id before upload.
    #[serde(default)]
    pub verify_digest: bool,
}

impl Default for RemediateConfig {
    fn default() -> Self {
        Self {
            concurrency: default_remediate_concurrency(),
            dry_run: false,
            verify_digest: false,
        }
    }
}

/// Retry and timeout policy for every store call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Per-call timeout.
    #[serde(default = "default_op_timeout_secs")]
    pub op_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            op_timeout_secs: default_op_timeout_secs(),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    #[must_use]
    pub const fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }
}
