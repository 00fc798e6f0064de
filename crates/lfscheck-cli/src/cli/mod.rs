use std::path::PathBuf;

use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `lfscheck` binary.
#[derive(Debug, Parser)]
#[command(
    name = "lfscheck",
    version,
    about = "Audit Git LFS objects across repositories and copy missing ones into the target store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Report format: json, table
    #[arg(long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only, no progress bars)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging; wins over --quiet)
    #[arg(short, long, visible_short_alias = 'd', visible_alias = "debug", global = true)]
    pub verbose: bool,

    /// Extra TOML config file, layered above the project config
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            config: self.config.clone(),
        }
    }
}
