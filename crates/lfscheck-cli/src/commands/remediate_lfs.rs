use lfscheck_config::LfsCheckConfig;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::RemediateLfsArgs;
use crate::output::output;
use crate::pipeline::{self, PipelineSettings, RemediateInput, StopAfter};
use crate::report::RunReport;

/// Handle `lfscheck remediate-lfs`.
pub async fn handle(
    args: &RemediateLfsArgs,
    mut config: LfsCheckConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<RunReport> {
    if let Some(dir) = &args.map_directory {
        config.paths.map_directory = bootstrap::path_string(dir);
    }
    if let Some(glob) = &args.input_glob {
        config.paths.input_glob.clone_from(glob);
    }
    bootstrap::apply_store_args(&mut config, &args.stores);
    if args.dry_run {
        config.remediate.dry_run = true;
    }
    bootstrap::validate(&config)?;

    let mut settings = PipelineSettings::from_config(&config)?;
    if args.stop_after_check {
        settings.stop_after = StopAfter::Check;
    }
    settings.remediation_output.clone_from(&args.remediation_output_file);

    let input = match &args.remediation_input_file {
        Some(path) => RemediateInput::File(path.clone()),
        None => RemediateInput::Maps,
    };

    let (source, target) = super::open_stores(&config)?;
    let report = pipeline::run_remediate(input, &settings, source, target).await?;
    output(&report, flags.format)?;
    Ok(report)
}
