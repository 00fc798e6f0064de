//! # lfscheck-config
//!
//! Layered configuration loading for lfscheck using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Command-line flags (applied by the binary after loading)
//! 2. Environment variables (`LFSCHECKER_*` prefix, `__` as separator)
//! 3. Project-level `.lfscheck/config.toml`
//! 4. User-level `~/.config/lfscheck/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `LFSCHECKER_TARGET__BUCKET` -> `target.bucket`,
//! `LFSCHECKER_CHECK__CONCURRENCY` -> `check.concurrency`, etc.
//!
//! Store credentials are not configured here; the object store SDK reads
//! them from `AWS_*` and `GOOGLE_*` variables.
//!
//! # Usage
//!
//! ```no_run
//! use lfscheck_config::LfsCheckConfig;
//!
//! let config = LfsCheckConfig::load_with_dotenv(None).expect("config");
//! config.validate().expect("valid config");
//! println!("target: {}", config.target.describe());
//! ```

mod error;
mod paths;
mod runtime;
mod scan;
mod store;

pub use error::ConfigError;
pub use paths::PathsConfig;
pub use runtime::{CheckConfig, RemediateConfig, RetryConfig};
pub use scan::{DEFAULT_BRANCH_PATTERN, ScanConfig};
pub use store::{StoreConfig, StoreProvider};

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "LFSCHECKER_";

/// Project-local config file, relative to the working directory.
pub const PROJECT_CONFIG_PATH: &str = ".lfscheck/config.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LfsCheckConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub check: CheckConfig,
    #[serde(default)]
    pub remediate: RemediateConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "StoreConfig::default_target")]
    pub target: StoreConfig,
    #[serde(default = "StoreConfig::default_source")]
    pub source: StoreConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Default for LfsCheckConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            check: CheckConfig::default(),
            remediate: RemediateConfig::default(),
            retry: RetryConfig::default(),
            target: StoreConfig::default_target(),
            source: StoreConfig::default_source(),
            paths: PathsConfig::default(),
        }
    }
}

impl LfsCheckConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed or a
    /// value has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with an explicit config file layered above the
    /// project file and below the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed, and
    /// [`ConfigError::InvalidValue`] if `path` does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::invalid(
                "config",
                format!("{} does not exist", path.display()),
            ));
        }
        Self::figment_with(Some(path))
            .extract()
            .map_err(ConfigError::from)
    }

    /// Load `.env` from the working directory, if there is one, then the
    /// layered configuration with `extra` as in [`Self::load_from`].
    ///
    /// Variables already set in the process environment win over `.env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Dotenv`] if `.env` exists but cannot be
    /// parsed, otherwise as [`Self::load`] and [`Self::load_from`].
    pub fn load_with_dotenv(extra: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = PathBuf::from(".env");
        if env_path.is_file() {
            dotenvy::from_path(&env_path).map_err(|e| ConfigError::Dotenv {
                path: env_path.clone(),
                reason: e.to_string(),
            })?;
        }
        match extra {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        }
    }

    /// Build the figment provider chain.
    #[must_use]
    pub fn figment() -> Figment {
        Self::figment_with(None)
    }

    /// Build the figment provider chain, with an optional extra TOML file.
    #[must_use]
    pub fn figment_with(extra: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(PROJECT_CONFIG_PATH);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        if let Some(extra) = extra {
            figment = figment.merge(Toml::file(extra));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Check values figment cannot reject on type alone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.repo_concurrency == 0 {
            return Err(ConfigError::invalid("scan.repo_concurrency", "must be at least 1"));
        }
        if self.scan.max_pointer_size == 0 {
            return Err(ConfigError::invalid("scan.max_pointer_size", "must be at least 1"));
        }
        if self.scan.clone_timeout_secs == 0 {
            return Err(ConfigError::invalid("scan.clone_timeout_secs", "must be at least 1"));
        }
        if self.check.concurrency == 0 {
            return Err(ConfigError::invalid("check.concurrency", "must be at least 1"));
        }
        if self.check.batch_size == 0 {
            return Err(ConfigError::invalid("check.batch_size", "must be at least 1"));
        }
        if self.remediate.concurrency == 0 {
            return Err(ConfigError::invalid("remediate.concurrency", "must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.op_timeout_secs == 0 {
            return Err(ConfigError::invalid("retry.op_timeout_secs", "must be at least 1"));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::invalid(
                "retry.initial_backoff_ms",
                "must not exceed retry.max_backoff_ms",
            ));
        }
        for (field, store) in [("target", &self.target), ("source", &self.source)] {
            if !store.is_configured() {
                let missing = if store.provider.needs_bucket() { "bucket" } else { "root" };
                return Err(ConfigError::invalid(
                    &format!("{field}.{missing}"),
                    format!("required for provider '{}'", store.provider),
                ));
            }
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lfscheck").join("config.toml"))
    }
}
