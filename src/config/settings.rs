//! Configuration file for backup-runner
//!
//! The configuration is a YAML document with camelCase keys holding an
//! ordered list of units:
//!
//! ```yaml
//! units:
//!   - unitName: documents
//!     sources: [/home/me/documents]
//!     destination: /mnt/backups
//!     excludes: [.tmp, .log]
//!     keepLastBackups: 5
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BackupError;
use crate::models::Unit;

/// Parsed configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Units in declaration order
    #[serde(default)]
    pub units: Vec<Unit>,
}

impl Config {
    /// Load the configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, BackupError> {
        if !path.is_file() {
            return Err(BackupError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            BackupError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            BackupError::Config(format!("Failed parsing yaml in {}: {}", path.display(), e))
        })
    }

    /// Parse a configuration from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self, BackupError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Find a unit by name
    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.name == name)
    }
}
