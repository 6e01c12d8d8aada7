//! Backup unit model
//!
//! A unit is a named group of source directories that are archived together
//! into one destination directory.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A backup task definition as read from the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Unit identifier, also the archive filename prefix
    #[serde(rename = "unitName")]
    pub name: String,

    /// Absolute paths of the directories to archive
    pub sources: Vec<PathBuf>,

    /// Absolute path of the directory that receives the archives
    pub destination: PathBuf,

    /// Dot-prefixed file extensions that are never archived
    #[serde(default, rename = "excludes")]
    pub excluded_extensions: Vec<String>,

    /// Key archive entries by the full source path instead of its leaf name
    #[serde(default = "default_true")]
    pub use_absolute_paths: bool,

    /// Requested symlink policy (see [`crate::backup::UnitProcessor`])
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Skip nested git repositories below a source
    #[serde(default = "default_true")]
    pub ignore_git_repositories: bool,

    /// Number of newest archives kept by retention
    ///
    /// Signed so that a bad value reaches validation instead of failing the
    /// whole configuration.
    #[serde(default = "default_keep_last_backups")]
    pub keep_last_backups: i64,

    /// Disabled units are skipped without error
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_keep_last_backups() -> i64 {
    3
}

impl Unit {
    /// Create an enabled unit with default policy values
    pub fn new(
        name: impl Into<String>,
        sources: Vec<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            sources,
            destination: destination.into(),
            excluded_extensions: Vec::new(),
            use_absolute_paths: true,
            follow_symlinks: false,
            ignore_git_repositories: true,
            keep_last_backups: default_keep_last_backups(),
            enabled: true,
        }
    }

    /// Archive prefix used for a source, both when archiving and restoring
    ///
    /// Either the full source path or its last component, depending on
    /// `use_absolute_paths`.
    pub fn archive_prefix(&self, source: &Path) -> String {
        let source = normalize_source_path(source);
        if self.use_absolute_paths {
            source.to_string_lossy().replace('\\', "/")
        } else {
            source
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default()
        }
    }
}

/// Resolve `.` and `..` components without touching the filesystem
///
/// tar entry names cannot carry either, so prefixes are built from this form.
/// `..` above the root is dropped.
pub fn normalize_source_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = normalized.components().next_back();
                let at_root = matches!(last, Some(Component::RootDir | Component::Prefix(_)));
                let can_pop = matches!(last, Some(Component::Normal(_)));
                if can_pop {
                    normalized.pop();
                } else if !at_root {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<String> = self
            .sources
            .iter()
            .map(|s| s.display().to_string())
            .collect();
        write!(
            f,
            "{} (sources: [{}], destination: {}, excludes: [{}], absolute paths: {}, follow symlinks: {}, keep: {}, enabled: {})",
            self.name,
            sources.join(", "),
            self.destination.display(),
            self.excluded_extensions.join(", "),
            self.use_absolute_paths,
            self.follow_symlinks,
            self.keep_last_backups,
            self.enabled,
        )
    }
}
