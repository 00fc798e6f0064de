use std::path::Path;

use anyhow::Context;
use lfscheck_config::LfsCheckConfig;
use lfscheck_git::RefSelectorConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{MapArgs, StoreArgs};

/// Load `.env`, then the layered configuration (plus `--config` if given).
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<LfsCheckConfig> {
    let config = LfsCheckConfig::load_with_dotenv(flags.config.as_deref());
    match flags.config.as_deref() {
        Some(path) => config.with_context(|| format!("failed to load config from {}", path.display())),
        None => config.context("failed to load configuration"),
    }
}

/// Apply ref selection and map location flags.
pub fn apply_map_args(config: &mut LfsCheckConfig, args: &MapArgs) {
    if let Some(dir) = &args.map_directory {
        config.paths.map_directory = path_string(dir);
    }
    if let Some(pattern) = &args.branch_pattern {
        config.scan.branch_pattern.clone_from(pattern);
    }
    if args.full_map {
        config.scan.full_map = true;
    }
}

/// Apply bucket overrides.
pub fn apply_store_args(config: &mut LfsCheckConfig, args: &StoreArgs) {
    if let Some(bucket) = &args.target_bucket {
        config.target.bucket.clone_from(bucket);
    }
    if let Some(bucket) = &args.source_bucket {
        config.source.bucket.clone_from(bucket);
    }
}

/// Reject the configuration before any stage starts.
pub fn validate(config: &LfsCheckConfig) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;
    RefSelectorConfig::new(&config.scan.branch_pattern).context("invalid scan.branch_pattern")?;
    Ok(())
}

pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use lfscheck_config::{LfsCheckConfig, StoreProvider};
    use pretty_assertions::assert_eq;

    use super::{apply_map_args, apply_store_args, validate};
    use crate::cli::root_commands::{MapArgs, StoreArgs};

    #[test]
    fn flags_override_loaded_values() {
        let mut config = LfsCheckConfig::default();
        apply_map_args(
            &mut config,
            &MapArgs {
                map_directory: Some(PathBuf::from("/var/maps")),
                branch_pattern: Some("release/.*".to_string()),
                full_map: true,
            },
        );
        apply_store_args(
            &mut config,
            &StoreArgs {
                target_bucket: Some("new-target".to_string()),
                source_bucket: None,
            },
        );

        assert_eq!(config.paths.map_directory, "/var/maps");
        assert_eq!(config.scan.branch_pattern, "release/.*");
        assert!(config.scan.full_map);
        assert_eq!(config.target.bucket, "new-target");
        assert_eq!(config.source.bucket, LfsCheckConfig::default().source.bucket);
    }

    #[test]
    fn absent_flags_keep_loaded_values() {
        let mut config = LfsCheckConfig::default();
        config.scan.full_map = true;
        apply_map_args(
            &mut config,
            &MapArgs {
                map_directory: None,
                branch_pattern: None,
                full_map: false,
            },
        );
        assert!(config.scan.full_map);
        assert_eq!(config.paths.map_directory, ".");
    }

    #[test]
    fn unparsable_branch_pattern_is_rejected() {
        let mut config = LfsCheckConfig::default();
        config.scan.branch_pattern = "v(".to_string();
        let error = validate(&config).unwrap_err();
        assert!(format!("{error:#}").contains("branch_pattern"));
    }

    #[test]
    fn empty_bucket_is_rejected() {
        let mut config = LfsCheckConfig::default();
        config.target.provider = StoreProvider::S3;
        config.target.bucket = String::new();
        assert!(validate(&config).is_err());
    }
}
