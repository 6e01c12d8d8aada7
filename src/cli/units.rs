//! Unit CLI commands
//!
//! Implements the backup, restore, list and validate commands on top of the
//! batch processor.

use chrono::Local;
use clap::Subcommand;

use crate::archive::ArchiveDiscovery;
use crate::backup::{BatchProcessor, BatchSummary};
use crate::config::Config;
use crate::error::BackupResult;
use crate::models::UnitValidator;

/// Unit subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum UnitCommands {
    /// Archive every enabled unit and apply retention
    Backup,

    /// Restore the newest archive of every enabled unit in place
    Restore {
        /// Replace files that already exist
        #[arg(short, long)]
        force: bool,
    },

    /// List the archives of every unit, newest first
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Check every unit's configuration without touching any files
    Validate,
}

/// Handle a unit command
///
/// Returns `false` when at least one unit failed with an error.
pub fn handle_unit_command(config: &Config, cmd: UnitCommands) -> BackupResult<bool> {
    match cmd {
        UnitCommands::Backup => {
            let summary = BatchProcessor::new(&config.units).backup_all();
            print_summary("Backup", &summary);
            Ok(summary.all_succeeded())
        }

        UnitCommands::Restore { force } => {
            let summary = BatchProcessor::new(&config.units).restore_all(force);
            print_summary("Restore", &summary);
            Ok(summary.all_succeeded())
        }

        UnitCommands::List { verbose } => {
            let mut ok = true;
            for unit in &config.units {
                println!("{} ({})", unit.name, unit.destination.display());

                let archives = match ArchiveDiscovery::for_unit(unit).find_newest_first() {
                    Ok(archives) => archives,
                    Err(e) => {
                        println!("  error: {}", e);
                        ok = false;
                        continue;
                    }
                };

                if archives.is_empty() {
                    println!("  No backups found.");
                    continue;
                }

                let now = Local::now().naive_local();
                for (i, archive) in archives.iter().enumerate() {
                    let age = format_age(now.signed_duration_since(archive.timestamp));
                    if verbose {
                        println!(
                            "  {}. {}\n     Created: {}\n     Size: {}\n     Age: {}",
                            i + 1,
                            archive.file_name(),
                            archive.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            format_size(archive.size_bytes()),
                            age,
                        );
                    } else {
                        println!(
                            "  {}. {} ({} ago, {})",
                            i + 1,
                            archive.file_name(),
                            age,
                            format_size(archive.size_bytes()),
                        );
                    }
                }
                println!("  Total: {} backup(s), keeping {}", archives.len(), unit.keep_last_backups);
            }
            Ok(ok)
        }

        UnitCommands::Validate => {
            let mut invalid = 0;
            for unit in &config.units {
                let errors = UnitValidator::new(unit).validate();
                if errors.is_empty() {
                    println!("{}: valid", unit.name);
                } else {
                    invalid += 1;
                    println!("{}: {} error(s)", unit.name, errors.len());
                    for err in &errors {
                        println!("  - {}", err);
                    }
                }
            }
            println!();
            println!(
                "{} of {} unit(s) valid",
                config.units.len() - invalid,
                config.units.len()
            );
            Ok(invalid == 0)
        }
    }
}

fn print_summary(operation: &str, summary: &BatchSummary) {
    println!();
    println!("{} Summary", operation);
    println!("{}", "=".repeat(operation.len() + 8));
    for run in &summary.runs {
        match &run.result {
            Ok(outcome) => println!("  {}: {}", run.unit_name, outcome.summary()),
            Err(e) => println!("  {}: FAILED ({})", run.unit_name, e),
        }
    }
    println!(
        "{} unit(s), {} skipped, {} failed",
        summary.runs.len(),
        summary.skipped_count(),
        summary.failure_count()
    );
}

/// Age of an archive as its two largest units, e.g. `3d 4h`
fn format_age(age: chrono::Duration) -> String {
    const UNITS: [(&str, i64); 4] = [("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)];

    let mut remaining = age.num_seconds().max(0);
    let parts: Vec<String> = UNITS
        .iter()
        .filter_map(|&(suffix, seconds)| {
            let count = remaining / seconds;
            remaining %= seconds;
            (count > 0).then(|| format!("{}{}", count, suffix))
        })
        .take(2)
        .collect();

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

/// Archive size with a binary unit suffix
fn format_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut suffix = SUFFIXES[0];
    for next in &SUFFIXES[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        suffix = next;
    }
    format!("{:.1} {}", value, suffix)
}
