//! backup-runner - single-shot backup and restore of directory groups
//!
//! This library backs up named groups of directories ("units") into
//! timestamped `.tar.gz` archives and restores the newest archive back to the
//! original locations. Each run processes every configured unit in order;
//! a failing unit is logged and skipped without affecting the others.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: YAML configuration loading and logging setup
//! - `error`: Custom error types
//! - `models`: The unit definition and its validation rules
//! - `archive`: Archive building, extraction and discovery
//! - `backup`: Per-unit and batch orchestration, retention
//! - `cli`: Command handlers for the binary
//!
//! # Example
//!
//! ```rust,ignore
//! use backup_runner::backup::BatchProcessor;
//! use backup_runner::config::Config;
//!
//! let config = Config::load(Path::new("backup.yaml"))?;
//! let summary = BatchProcessor::new(&config.units).backup_all();
//! assert!(summary.all_succeeded());
//! ```

pub mod archive;
pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;

#[cfg(test)]
mod testing;

pub use error::{BackupError, BackupResult};
