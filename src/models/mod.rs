//! Core data models for backup-runner
//!
//! This module contains the unit definition and its validation rules.

pub mod unit;
pub mod validation;

pub use unit::{normalize_source_path, Unit};
pub use validation::{UnitValidator, ValidationError, MAX_UNIT_NAME_LENGTH};
