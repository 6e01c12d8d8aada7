//! Configuration module for backup-runner
//!
//! This module provides:
//! - Loading the YAML unit configuration
//! - Logging setup (level threshold, console and file sinks)

pub mod logging;
pub mod settings;

pub use logging::{init_logging, LogLevel, LogMode};
pub use settings::Config;
