use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use backup_runner::cli::{handle_unit_command, UnitCommands};
use backup_runner::config::{init_logging, Config, LogLevel, LogMode};

#[derive(Parser)]
#[command(
    name = "backup-runner",
    version,
    about = "Back up and restore groups of directories as timestamped tar.gz archives",
    long_about = "backup-runner archives the source directories of every unit in a \
                  YAML configuration into <destination>/<unit>-<yyyyMMddHHmmss>.tar.gz, \
                  keeps the newest archives per unit, and restores the newest archive \
                  back in place on request."
)]
struct Cli {
    /// Path to the config YAML file
    #[arg(short, long, env = "BACKUP_RUNNER_CONFIG")]
    config: PathBuf,

    /// Log level threshold
    #[arg(short, long, value_enum, ignore_case = true, default_value = "info")]
    verbose: LogLevel,

    /// Optional path to a log file
    #[arg(long)]
    log_path: Option<PathBuf>,

    /// Whether an existing log file is appended to or overwritten
    #[arg(long, value_enum, ignore_case = true, default_value = "overwrite")]
    log_mode: LogMode,

    #[command(subcommand)]
    command: UnitCommands,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_path.as_deref(), cli.log_mode)
        .context("Failed initializing logging")?;

    let config = Config::load(&cli.config)?;

    let all_succeeded = handle_unit_command(&config, cli.command)?;

    Ok(if all_succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
