use lfscheck_config::LfsCheckConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::report::RunReport;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    config: LfsCheckConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<RunReport> {
    match command {
        Commands::CheckLfs(args) => commands::check_lfs::handle(&args, config, flags).await,
        Commands::OidMapper(args) => commands::oid_mapper::handle(&args, config, flags).await,
        Commands::RemediateLfs(args) => commands::remediate_lfs::handle(&args, config, flags).await,
    }
}
