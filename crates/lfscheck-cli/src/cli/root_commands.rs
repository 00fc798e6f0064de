use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Map, check and remediate every repository in a repository list.
    #[command(visible_alias = "check_lfs")]
    CheckLfs(CheckLfsArgs),
    /// Write the object map of one local checkout.
    #[command(visible_alias = "oid_mapper")]
    OidMapper(OidMapperArgs),
    /// Check persisted object maps (or a remediation file) against the
    /// target store and copy missing objects from the source store.
    #[command(visible_alias = "remediate_lfs")]
    RemediateLfs(RemediateLfsArgs),
}

/// Ref selection and object map flags shared by the mapping commands.
#[derive(Clone, Debug, Args)]
pub struct MapArgs {
    /// Directory object maps are written to and read from
    #[arg(short, long, value_name = "DIR")]
    pub map_directory: Option<PathBuf>,

    /// Branches matching this regex are scanned besides tags and the default branch
    #[arg(long, value_name = "REGEX")]
    pub branch_pattern: Option<String>,

    /// Record the refs and paths where each object was found
    #[arg(long)]
    pub full_map: bool,
}

/// Store overrides shared by the checking and remediation commands.
#[derive(Clone, Debug, Args)]
pub struct StoreArgs {
    /// Target bucket (overrides target.bucket)
    #[arg(short = 'b', long = "bucket", value_name = "BUCKET")]
    pub target_bucket: Option<String>,

    /// Source bucket (overrides source.bucket)
    #[arg(
        short = 'o',
        long = "original-bucket",
        visible_alias = "source-bucket",
        value_name = "BUCKET"
    )]
    pub source_bucket: Option<String>,
}

/// Arguments for `lfscheck check-lfs`.
#[derive(Clone, Debug, Args)]
pub struct CheckLfsArgs {
    /// Repository list, one https URL per line (default: paths.input_file)
    #[arg(short = 'f', long = "input-file", value_name = "FILE")]
    pub input_file: Option<PathBuf>,

    /// Repository list as a positional argument
    #[arg(value_name = "FILE", conflicts_with = "input_file")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub map: MapArgs,

    #[command(flatten)]
    pub stores: StoreArgs,

    /// Directory holding <owner>/<name> checkouts (default: a temporary directory)
    #[arg(long, value_name = "DIR")]
    pub checkout_root: Option<PathBuf>,

    /// Never clone; repositories without a checkout are skipped
    #[arg(long)]
    pub no_clone: bool,

    /// Scan repositories even when their object map is already persisted
    #[arg(long)]
    pub rescan: bool,

    /// Stop once object maps are written
    #[arg(long, conflicts_with = "stop_after_check")]
    pub stop_after_scan: bool,

    /// Stop once the remediation candidates are written
    #[arg(long)]
    pub stop_after_check: bool,

    /// Write remediation entries to this file
    #[arg(long, value_name = "FILE")]
    pub remediation_output_file: Option<PathBuf>,

    /// Report what would be copied without writing to the target store
    #[arg(short = 'x', long)]
    pub dry_run: bool,
}

impl CheckLfsArgs {
    /// The repository list given either way, if any.
    #[must_use]
    pub fn repo_list(&self) -> Option<PathBuf> {
        self.input_file.clone().or_else(|| self.input.clone())
    }
}

/// Arguments for `lfscheck oid-mapper`.
#[derive(Clone, Debug, Args)]
pub struct OidMapperArgs {
    /// Local checkout (bare or non-bare) to scan
    #[arg(
        short = 'r',
        long = "repo-directory",
        visible_alias = "repo-dir",
        value_name = "DIR",
        default_value = "."
    )]
    pub repo_directory: PathBuf,

    /// Repository owner, usually the organization
    #[arg(short = 'u', long, visible_alias = "user")]
    pub owner: String,

    /// Repository name
    #[arg(short = 'n', long)]
    pub repository: String,

    #[command(flatten)]
    pub map: MapArgs,
}

/// Arguments for `lfscheck remediate-lfs`.
#[derive(Clone, Debug, Args)]
pub struct RemediateLfsArgs {
    /// Directory containing object maps
    #[arg(short, long, value_name = "DIR")]
    pub map_directory: Option<PathBuf>,

    /// Glob selecting object map files (default: paths.input_glob)
    #[arg(short = 'g', long, value_name = "GLOB")]
    pub input_glob: Option<String>,

    /// Resume from a remediation file instead of checking object maps
    #[arg(long, value_name = "FILE")]
    pub remediation_input_file: Option<PathBuf>,

    /// Write remediation entries to this file
    #[arg(long, value_name = "FILE")]
    pub remediation_output_file: Option<PathBuf>,

    #[command(flatten)]
    pub stores: StoreArgs,

    /// Stop once the remediation candidates are written
    #[arg(long, conflicts_with = "remediation_input_file")]
    pub stop_after_check: bool,

    /// Report what would be copied without writing to the target store
    #[arg(short = 'x', long)]
    pub dry_run: bool,
}
