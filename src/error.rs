//! Custom error types for backup-runner
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. Unit validation problems are not part of
//! this hierarchy: they are collected as values by
//! [`UnitValidator`](crate::models::UnitValidator).

use thiserror::Error;

/// The main error type for backup-runner operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors while creating, reading or restoring an archive
    #[error("I/O error: {0}")]
    Io(String),

    /// A file, directory or archive that should exist does not
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Excluded extension without a leading dot
    #[error("Extension must start with a '.': {0}")]
    InvalidExtension(String),

    /// Container level (tar/gzip) errors
    #[error("Archive error: {0}")]
    Archive(String),
}

impl BackupError {
    /// Create a "not found" error for files
    pub fn file_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "File",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for directories
    pub fn directory_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Directory",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for archives
    pub fn archive_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Archive",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an I/O error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<walkdir::Error> for BackupError {
    fn from(err: walkdir::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for BackupError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for backup-runner operations
pub type BackupResult<T> = Result<T, BackupError>;
