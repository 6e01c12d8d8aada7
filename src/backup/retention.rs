//! Retention pruning
//!
//! Keeps the newest `keepLastBackups` archives of a unit and deletes the
//! rest. Deletion is best effort: a file that cannot be removed is logged and
//! the remaining stale archives are still attempted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::archive::ArchiveDiscovery;
use crate::error::BackupResult;
use crate::models::Unit;

/// Outcome of a pruning pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetentionReport {
    /// Archives found before pruning
    pub found: usize,
    /// Archives left in place
    pub kept: usize,
    /// Archives removed
    pub deleted: Vec<PathBuf>,
    /// Archives that could not be removed, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

impl RetentionReport {
    pub fn summary(&self) -> String {
        format!(
            "{} found, {} kept, {} deleted, {} failed",
            self.found,
            self.kept,
            self.deleted.len(),
            self.failed.len()
        )
    }
}

/// Deletes archives beyond a unit's retention count
pub struct RetentionPruner {
    discovery: ArchiveDiscovery,
    unit_name: String,
    keep_last: usize,
}

impl RetentionPruner {
    pub fn new(unit: &Unit) -> Self {
        Self {
            discovery: ArchiveDiscovery::for_unit(unit),
            unit_name: unit.name.clone(),
            // Validation rejects values below one before retention runs
            keep_last: usize::try_from(unit.keep_last_backups.max(1)).unwrap_or(usize::MAX),
        }
    }

    /// Delete every archive beyond the newest `keep_last`
    pub fn prune(&self) -> BackupResult<RetentionReport> {
        self.prune_with(|path| fs::remove_file(path))
    }

    /// Like [`prune`](Self::prune) with a custom delete operation
    pub fn prune_with<F>(&self, mut remove: F) -> BackupResult<RetentionReport>
    where
        F: FnMut(&Path) -> io::Result<()>,
    {
        info!("Cleaning up older backups of unit {}", self.unit_name);
        let archives = self.discovery.find_newest_first()?;

        info!(
            "Found {} backups of unit {}. Keeping the newest {}...",
            archives.len(),
            self.unit_name,
            self.keep_last
        );

        let mut report = RetentionReport {
            found: archives.len(),
            kept: archives.len().min(self.keep_last),
            ..RetentionReport::default()
        };

        if archives.len() <= self.keep_last {
            info!("No deletions.");
            return Ok(report);
        }

        for archive in archives.into_iter().skip(self.keep_last) {
            info!("Deleting {}.", archive.path.display());
            match remove(&archive.path) {
                Ok(()) => report.deleted.push(archive.path),
                Err(e) => {
                    error!("Failed deleting {}. {}", archive.path.display(), e);
                    debug!("{:?}", e);
                    report.failed.push((archive.path, e.to_string()));
                }
            }
        }

        Ok(report)
    }
}
