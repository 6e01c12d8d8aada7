//! Archive engine for backup-runner
//!
//! Reads and writes gzip-compressed tar archives and finds the archives that
//! belong to a unit.
//!
//! # Architecture
//!
//! - `ArchiveBuilder`: stages files and directories, then streams them into
//!   a `.tar.gz` file one entry at a time
//! - `ArchiveExtractor`: streams entries out of an archive into mapped
//!   destination folders
//! - `ArchiveDiscovery`: lists a unit's archives newest first by parsing the
//!   timestamp embedded in the filename
//!
//! # Archive Format
//!
//! Archives are named `<unit>-<yyyyMMddHHmmss>.tar.gz` and live directly in
//! the unit's destination directory. Entry names always use `/` separators
//! and never start with `/`.
//!
//! # Example
//!
//! ```rust,ignore
//! use backup_runner::archive::{ArchiveBuilder, ArchiveExtractor};
//!
//! let mut builder = ArchiveBuilder::new();
//! builder.exclude_extensions([".log"])?;
//! builder.add_directory(Path::new("/srv/docs"), Some("docs"))?;
//! builder.save(Path::new("/backups/docs-20250101120000.tar.gz"))?;
//!
//! let mut extractor = ArchiveExtractor::open("/backups/docs-20250101120000.tar.gz")?;
//! extractor.map_folder("docs", "/srv/docs")?;
//! let report = extractor.extract()?;
//! ```

mod builder;
mod discovery;
mod extractor;

pub use builder::{ArchiveBuilder, ArchiveEntry, SaveReport};
pub use discovery::{
    archive_file_name, parse_archive_timestamp, ArchiveDiscovery, DiscoveredArchive,
    ARCHIVE_EXTENSION, TIMESTAMP_FORMAT,
};
pub use extractor::{ArchiveExtractor, ExtractReport, FolderMapping};

/// Normalize an archive entry name: forward slashes, no leading slash
pub(crate) fn normalize_entry_name(name: &str) -> String {
    name.replace('\\', "/").trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_entry_name() {
        assert_eq!(normalize_entry_name("/srv/docs/a.txt"), "srv/docs/a.txt");
        assert_eq!(normalize_entry_name("docs\\sub\\a.txt"), "docs/sub/a.txt");
        assert_eq!(normalize_entry_name("a.txt"), "a.txt");
    }
}
