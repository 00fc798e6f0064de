use anyhow::Context;
use lfscheck_config::LfsCheckConfig;
use lfscheck_core::repo::read_repo_list;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::CheckLfsArgs;
use crate::output::output;
use crate::pipeline::{self, PipelineSettings, StopAfter};
use crate::report::{RunReport, SkippedRepo};

/// Handle `lfscheck check-lfs`.
pub async fn handle(
    args: &CheckLfsArgs,
    mut config: LfsCheckConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<RunReport> {
    bootstrap::apply_map_args(&mut config, &args.map);
    bootstrap::apply_store_args(&mut config, &args.stores);
    if let Some(root) = &args.checkout_root {
        config.scan.checkout_root = bootstrap::path_string(root);
    }
    if args.no_clone {
        config.scan.clone = false;
    }
    if args.rescan {
        config.scan.rescan = true;
    }
    if args.dry_run {
        config.remediate.dry_run = true;
    }
    bootstrap::validate(&config)?;

    let list_path = args.repo_list().unwrap_or_else(|| config.paths.input_file());
    let list = read_repo_list(&list_path)
        .with_context(|| format!("failed to read repository list {}", list_path.display()))?;
    if list.repos.is_empty() {
        tracing::warn!(path = %list_path.display(), "repository list names no usable repositories");
    }

    let mut settings = PipelineSettings::from_config(&config)?;
    settings.stop_after = stop_after(args);
    settings.remediation_output.clone_from(&args.remediation_output_file);

    let (source, target) = super::open_stores(&config)?;
    let mut report = pipeline::run_check(list.repos, &settings, source, target).await?;
    report.add_skipped(list.skipped.into_iter().map(|line| SkippedRepo {
        repo: line.content,
        reason: format!("line {}: {}", line.line_number, line.reason),
    }));

    output(&report, flags.format)?;
    Ok(report)
}

const fn stop_after(args: &CheckLfsArgs) -> StopAfter {
    if args.stop_after_scan {
        StopAfter::Scan
    } else if args.stop_after_check {
        StopAfter::Check
    } else {
        StopAfter::Never
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::stop_after;
    use crate::cli::{Cli, Commands};
    use crate::pipeline::StopAfter;

    fn parse(argv: &[&str]) -> crate::cli::root_commands::CheckLfsArgs {
        match Cli::try_parse_from(argv).expect("cli should parse").command {
            Commands::CheckLfs(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn stage_flags_select_the_stop_point() {
        assert_eq!(stop_after(&parse(&["lfscheck", "check-lfs"])), StopAfter::Never);
        assert_eq!(
            stop_after(&parse(&["lfscheck", "check-lfs", "--stop-after-scan"])),
            StopAfter::Scan
        );
        assert_eq!(
            stop_after(&parse(&["lfscheck", "check-lfs", "--stop-after-check"])),
            StopAfter::Check
        );
    }

    #[test]
    fn both_stop_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "lfscheck",
            "check-lfs",
            "--stop-after-scan",
            "--stop-after-check",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn repository_list_comes_from_either_form() {
        let short = parse(&["lfscheck", "check-lfs", "-f", "repos.txt", "-x", "-m", "maps"]);
        assert_eq!(short.repo_list().as_deref(), Some(std::path::Path::new("repos.txt")));
        assert!(short.dry_run);
        assert_eq!(short.map.map_directory.as_deref(), Some(std::path::Path::new("maps")));

        let positional = parse(&["lfscheck", "check-lfs", "other.txt"]);
        assert_eq!(positional.repo_list().as_deref(), Some(std::path::Path::new("other.txt")));

        assert!(parse(&["lfscheck", "check-lfs"]).repo_list().is_none());
    }
}
