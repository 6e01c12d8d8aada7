//! Batch processing over all configured units
//!
//! Units are processed one at a time in declaration order. An error escaping
//! one unit is logged and recorded, and the batch moves on to the next unit.

use tracing::{debug, error, info};

use super::unit::{UnitOutcome, UnitProcessor};
use crate::error::{BackupError, BackupResult};
use crate::models::Unit;

/// The operation applied to every unit of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Backup,
    Restore { force_overwrite: bool },
}

/// Result of one unit within a batch
#[derive(Debug)]
pub struct UnitRun {
    pub unit_name: String,
    pub result: BackupResult<UnitOutcome>,
}

impl UnitRun {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}

/// Per-unit results of a batch, in declaration order
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub runs: Vec<UnitRun>,
}

impl BatchSummary {
    /// Units whose processing ended with an error
    pub fn failures(&self) -> impl Iterator<Item = (&str, &BackupError)> {
        self.runs.iter().filter_map(|run| match &run.result {
            Err(err) => Some((run.unit_name.as_str(), err)),
            Ok(_) => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.runs.iter().filter(|run| run.is_failure()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.runs
            .iter()
            .filter(|run| matches!(&run.result, Ok(outcome) if outcome.is_skipped()))
            .count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Applies an operation to a list of units with per-unit fault isolation
pub struct BatchProcessor<'a> {
    units: &'a [Unit],
}

impl<'a> BatchProcessor<'a> {
    pub fn new(units: &'a [Unit]) -> Self {
        Self { units }
    }

    pub fn backup_all(&self) -> BatchSummary {
        info!("Writing backup...");
        self.run(Operation::Backup)
    }

    pub fn restore_all(&self, force_overwrite: bool) -> BatchSummary {
        info!("Loading backup...");
        self.run(Operation::Restore { force_overwrite })
    }

    /// Run `operation` on every unit, never stopping early
    pub fn run(&self, operation: Operation) -> BatchSummary {
        info!("Processing config! Found {} units.", self.units.len());
        let mut summary = BatchSummary::default();

        for unit in self.units {
            info!("Processing unit {}.", unit.name);
            let processor = UnitProcessor::new(unit);
            let result = match operation {
                Operation::Backup => processor.backup_unit(),
                Operation::Restore { force_overwrite } => processor.restore_unit(force_overwrite),
            };

            if let Err(err) = &result {
                error!("Failed processing unit {}. Skipping!", unit.name);
                debug!("{:?}", err);
            }

            summary.runs.push(UnitRun {
                unit_name: unit.name.clone(),
                result,
            });
        }

        summary
    }
}
