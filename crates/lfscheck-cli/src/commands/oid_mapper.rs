use lfscheck_config::LfsCheckConfig;
use lfscheck_core::RepoReference;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::OidMapperArgs;
use crate::output::output;
use crate::pipeline::{self, PipelineSettings};
use crate::report::RunReport;

/// Handle `lfscheck oid-mapper`.
pub async fn handle(
    args: &OidMapperArgs,
    mut config: LfsCheckConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<RunReport> {
    bootstrap::apply_map_args(&mut config, &args.map);
    bootstrap::validate(&config)?;

    let repo = RepoReference::new(args.owner.trim(), args.repository.trim());
    if repo.owner.is_empty() || repo.name.is_empty() {
        anyhow::bail!("both --owner and --repository must be non-empty");
    }

    let settings = PipelineSettings::from_config(&config)?;
    let report = pipeline::run_map_one(&args.repo_directory, repo, &settings).await?;
    output(&report, flags.format)?;
    Ok(report)
}
