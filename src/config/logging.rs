//! Logging setup
//!
//! Installs the process-wide `tracing` subscriber once at startup: a console
//! sink on stdout plus an optional file sink. Every line carries a local
//! `yy-MM-dd HH:mm:ss` timestamp and the level. The subscriber is not
//! reconfigured after `init_logging` returns.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, time::FormatTime};
use tracing_subscriber::prelude::*;

use crate::error::{BackupError, BackupResult};

/// Minimum level a message needs to reach the sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
        }
    }
}

/// How an existing log file is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    Append,
    #[default]
    Overwrite,
}

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%y-%m-%d %H:%M:%S"))
    }
}

/// Install the console sink and, if `log_path` is given, a file sink
pub fn init_logging(level: LogLevel, log_path: Option<&Path>, mode: LogMode) -> BackupResult<()> {
    let filter = level.as_filter();

    let console_layer = fmt::layer()
        .with_timer(LocalTimer)
        .with_target(false)
        .with_writer(std::io::stdout)
        .with_filter(filter);

    let file_layer = match log_path {
        Some(path) => {
            let file = open_log_file(path, mode)?;
            Some(
                fmt::layer()
                    .with_timer(LocalTimer)
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| BackupError::Config(format!("Failed to initialize logging: {}", e)))
}

fn open_log_file(path: &Path, mode: LogMode) -> BackupResult<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        LogMode::Append => options.append(true),
        LogMode::Overwrite => options.write(true).truncate(true),
    };

    options.open(path).map_err(|e| {
        BackupError::Io(format!("Failed to open log file {}: {}", path.display(), e))
    })
}
