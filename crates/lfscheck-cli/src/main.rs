#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

use clap::Parser;

mod bootstrap;
mod cli;
mod commands;
mod output;
mod pipeline;
mod progress;
mod report;
mod ui;

/// Exit status for configuration and authorization failures.
const FATAL_EXIT: i32 = 2;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("lfscheck error: {error:#}");
            std::process::exit(FATAL_EXIT);
        }
    }
}

async fn run() -> anyhow::Result<i32> {
    let cli = cli::Cli::parse();
    let flags = cli.global_flags();
    init_tracing(&flags)?;
    ui::init(&flags);

    let config = bootstrap::load_config(&flags)?;
    let report = commands::dispatch::dispatch(cli.command, config, &flags).await?;
    Ok(report.exit_code())
}

/// Logs go to stderr; stdout carries the report.
fn init_tracing(flags: &cli::GlobalFlags) -> anyhow::Result<()> {
    let level = if flags.verbose {
        "debug"
    } else if flags.quiet {
        "error"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("LFSCHECKER_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
