//! Archive discovery
//!
//! Finds the archives of a unit by filename. Only files named exactly
//! `<unit>-<yyyyMMddHHmmss>.tar.gz` directly inside the destination
//! directory count; anything else is ignored.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::error::{BackupError, BackupResult};
use crate::models::Unit;

/// chrono format of the timestamp embedded in archive names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Extension shared by all archives
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

const TIMESTAMP_DIGITS: usize = 14;

/// An archive found in a destination directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredArchive {
    /// Full path to the archive
    pub path: PathBuf,
    /// Timestamp parsed from the filename
    pub timestamp: NaiveDateTime,
}

impl DiscoveredArchive {
    /// Archive filename without directory
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Size on disk, or 0 if the file vanished
    pub fn size_bytes(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

/// Lists a unit's archives, newest first
#[derive(Debug, Clone)]
pub struct ArchiveDiscovery {
    destination: PathBuf,
    unit_name: String,
}

impl ArchiveDiscovery {
    pub fn new(destination: impl Into<PathBuf>, unit_name: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            unit_name: unit_name.into(),
        }
    }

    /// Discovery over a unit's destination directory
    pub fn for_unit(unit: &Unit) -> Self {
        Self::new(unit.destination.clone(), unit.name.clone())
    }

    /// All archives of the unit ordered by timestamp, newest first
    ///
    /// Does not recurse into subdirectories.
    pub fn find_newest_first(&self) -> BackupResult<Vec<DiscoveredArchive>> {
        let read_dir = fs::read_dir(&self.destination).map_err(|e| {
            BackupError::Io(format!(
                "Failed to read destination directory {}: {}",
                self.destination.display(),
                e
            ))
        })?;

        let mut archives = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| {
                BackupError::Io(format!("Failed to read directory entry: {}", e))
            })?;

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };

            if let Some(timestamp) = parse_archive_timestamp(&self.unit_name, file_name) {
                archives.push(DiscoveredArchive { path, timestamp });
            }
        }

        archives.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(archives)
    }

    /// The newest archive, if any
    pub fn latest(&self) -> BackupResult<Option<DiscoveredArchive>> {
        Ok(self.find_newest_first()?.into_iter().next())
    }
}

/// Build the archive filename for a unit at a point in time
pub fn archive_file_name(unit_name: &str, timestamp: &NaiveDateTime) -> String {
    format!(
        "{}-{}{}",
        unit_name,
        timestamp.format(TIMESTAMP_FORMAT),
        ARCHIVE_EXTENSION
    )
}

/// Parse the timestamp out of `<unit_name>-<14 digits>.tar.gz`
///
/// Returns `None` if the name does not follow the convention or the digits
/// are not a valid date and time.
pub fn parse_archive_timestamp(unit_name: &str, file_name: &str) -> Option<NaiveDateTime> {
    let digits = file_name
        .strip_prefix(unit_name)?
        .strip_prefix('-')?
        .strip_suffix(ARCHIVE_EXTENSION)?;

    if digits.len() != TIMESTAMP_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    NaiveDateTime::parse_from_str(digits, TIMESTAMP_FORMAT).ok()
}
