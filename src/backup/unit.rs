//! Per-unit processing
//!
//! Runs the guard sequence (enabled, validation, symlink policy) for a unit
//! and then archives or restores it.

use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, error, info, warn};

use super::retention::{RetentionPruner, RetentionReport};
use crate::archive::{
    archive_file_name, ArchiveBuilder, ArchiveDiscovery, ArchiveExtractor, ExtractReport,
    SaveReport,
};
use crate::error::BackupResult;
use crate::models::{Unit, UnitValidator, ValidationError};

/// How a unit run ended when no error escaped
#[derive(Debug)]
pub enum UnitOutcome {
    /// The unit is disabled; nothing was done
    Disabled,
    /// Validation failed; nothing was done
    Invalid(Vec<ValidationError>),
    /// An archive was written and retention applied
    BackedUp {
        archive: PathBuf,
        save: SaveReport,
        retention: RetentionReport,
    },
    /// Restore was requested but the unit has no archive
    NoArchive,
    /// The newest archive was extracted in place
    Restored {
        archive: PathBuf,
        extract: ExtractReport,
    },
}

impl UnitOutcome {
    /// True for the handled skips (disabled, invalid, nothing to restore)
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Disabled | Self::Invalid(_) | Self::NoArchive)
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Disabled => "disabled, skipped".to_string(),
            Self::Invalid(errors) => format!("invalid ({} error(s)), skipped", errors.len()),
            Self::BackedUp {
                archive,
                save,
                retention,
            } => format!(
                "saved {} ({} file(s)); retention: {}",
                archive.display(),
                save.files_written,
                retention.summary()
            ),
            Self::NoArchive => "no backup found, skipped".to_string(),
            Self::Restored { archive, extract } => {
                format!("restored {}: {}", archive.display(), extract.summary())
            }
        }
    }
}

/// Archives or restores a single unit
pub struct UnitProcessor<'a> {
    unit: &'a Unit,
}

impl<'a> UnitProcessor<'a> {
    pub fn new(unit: &'a Unit) -> Self {
        Self { unit }
    }

    /// Write a new archive of every source and apply retention
    ///
    /// Errors while building or saving the archive are returned to the caller;
    /// retention only runs after a successful save.
    pub fn backup_unit(&self) -> BackupResult<UnitOutcome> {
        if let Some(outcome) = self.check_guards() {
            return Ok(outcome);
        }
        let follow_symlinks = self.effective_follow_symlinks();

        let unit = self.unit;
        let mut builder = ArchiveBuilder::new();
        builder
            .exclude_extensions(&unit.excluded_extensions)?
            .follow_symlinks(follow_symlinks)
            .ignore_git_repositories(unit.ignore_git_repositories);

        for source in &unit.sources {
            let prefix = unit.archive_prefix(source);
            debug!("Adding {} as {}", source.display(), prefix);
            builder.add_directory(source, Some(&prefix))?;
        }

        let output = self.archive_path(Local::now().naive_local());
        let save = builder.save(&output)?;
        info!("Unit {} saved to {}", unit.name, output.display());

        let retention = RetentionPruner::new(unit).prune()?;

        Ok(UnitOutcome::BackedUp {
            archive: output,
            save,
            retention,
        })
    }

    /// Extract the newest archive back into the source directories
    pub fn restore_unit(&self, force_overwrite: bool) -> BackupResult<UnitOutcome> {
        if let Some(outcome) = self.check_guards() {
            return Ok(outcome);
        }
        // Restore never creates symlinks; the call only reports an unsupported request
        self.effective_follow_symlinks();

        let unit = self.unit;
        let Some(latest) = ArchiveDiscovery::for_unit(unit).latest()? else {
            error!("No backups found for unit {}!", unit.name);
            return Ok(UnitOutcome::NoArchive);
        };

        info!("Loading backup {}...", latest.file_name());
        let mut extractor = ArchiveExtractor::open(&latest.path)?;
        extractor.force_overwrite(force_overwrite);

        for source in &unit.sources {
            let prefix = unit.archive_prefix(source);
            debug!("Extracting all archived files in {} to {}", prefix, source.display());
            extractor.map_folder(&prefix, source)?;
        }

        debug!("Starting extraction...");
        let extract = extractor.extract()?;
        info!("Finished extraction of {}", latest.file_name());

        Ok(UnitOutcome::Restored {
            archive: latest.path,
            extract,
        })
    }

    /// Output path `<destination>/<name>-<timestamp>.tar.gz`
    pub fn archive_path(&self, timestamp: NaiveDateTime) -> PathBuf {
        self.unit
            .destination
            .join(archive_file_name(&self.unit.name, &timestamp))
    }

    /// Symlink policy applied for this run
    ///
    /// Following symlinks is not supported, so this is always `false`. The
    /// stored unit is left as configured.
    pub fn effective_follow_symlinks(&self) -> bool {
        if self.unit.follow_symlinks {
            warn!(
                "followSymlinks is not supported! Ignoring symlinks for unit {}.",
                self.unit.name
            );
        }
        false
    }

    /// Returns the outcome to stop with, or `None` to proceed
    fn check_guards(&self) -> Option<UnitOutcome> {
        let unit = self.unit;
        debug!("Processing {}", unit);

        if !unit.enabled {
            warn!("Unit {} is disabled. Skipping!", unit.name);
            return Some(UnitOutcome::Disabled);
        }

        info!("Validating unit {}...", unit.name);
        let errors = UnitValidator::new(unit).validate();
        if !errors.is_empty() {
            for err in &errors {
                error!("{}", err);
            }
            error!("Unit validation failed for {}", unit.name);
            return Some(UnitOutcome::Invalid(errors));
        }
        info!("No errors found! Unit {} is valid.", unit.name);

        None
    }
}
