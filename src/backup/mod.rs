//! Backup orchestration for backup-runner
//!
//! Sequences validation, archiving, restoring and retention across the
//! configured units.
//!
//! # Architecture
//!
//! - `BatchProcessor`: walks the units in declaration order and isolates
//!   failures so one broken unit never stops the others
//! - `UnitProcessor`: guard checks, then archive or restore for one unit
//! - `RetentionPruner`: deletes archives beyond `keepLastBackups`
//!
//! # Example
//!
//! ```rust,ignore
//! use backup_runner::backup::BatchProcessor;
//! use backup_runner::config::Config;
//!
//! let config = Config::load(Path::new("backup.yaml"))?;
//! let summary = BatchProcessor::new(&config.units).backup_all();
//! for (unit, err) in summary.failures() {
//!     eprintln!("{}: {}", unit, err);
//! }
//! ```

mod batch;
mod retention;
mod unit;

pub use batch::{BatchProcessor, BatchSummary, Operation, UnitRun};
pub use retention::{RetentionPruner, RetentionReport};
pub use unit::{UnitOutcome, UnitProcessor};
