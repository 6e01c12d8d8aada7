//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup layer.

pub mod units;

pub use units::{handle_unit_command, UnitCommands};
