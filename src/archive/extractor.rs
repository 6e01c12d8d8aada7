//! Archive extraction
//!
//! Restores parts of a `.tar.gz` archive into destination folders. Each
//! folder mapping routes entries below an archive prefix to a directory on
//! disk; entries that match no mapping are left in the archive.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::EntryType;
use tracing::{debug, info, warn};

use super::normalize_entry_name;
use crate::error::{BackupError, BackupResult};

/// Routes archive entries below `archive_prefix` into `destination`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderMapping {
    /// Archive-internal prefix without leading or trailing slashes
    pub archive_prefix: String,
    /// Absolute destination directory
    pub destination: PathBuf,
}

/// Result of an extraction run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    /// Files written to disk
    pub extracted: usize,
    /// Files left alone because the destination already existed
    pub skipped_existing: usize,
    /// Entries whose path matched no folder mapping
    pub skipped_unmapped: usize,
    /// Symlinks, hard links and other non-regular entries
    pub skipped_unsupported: usize,
    /// Entries whose relative path would leave the destination
    pub skipped_unsafe: usize,
}

impl ExtractReport {
    /// Total number of file entries that were not written
    pub fn skipped(&self) -> usize {
        self.skipped_existing + self.skipped_unmapped + self.skipped_unsupported + self.skipped_unsafe
    }

    pub fn summary(&self) -> String {
        format!(
            "{} extracted, {} existing, {} unmapped, {} unsupported, {} unsafe",
            self.extracted,
            self.skipped_existing,
            self.skipped_unmapped,
            self.skipped_unsupported,
            self.skipped_unsafe
        )
    }
}

/// Extracts mapped folders from one archive
#[derive(Debug)]
pub struct ArchiveExtractor {
    archive_path: PathBuf,
    /// Kept in registration order; the first match wins during extraction
    mappings: Vec<FolderMapping>,
    force_overwrite: bool,
}

impl ArchiveExtractor {
    /// Bind an extractor to an existing archive file
    pub fn open(archive_path: impl AsRef<Path>) -> BackupResult<Self> {
        let archive_path = archive_path.as_ref();
        if !archive_path.is_file() {
            return Err(BackupError::archive_not_found(
                archive_path.display().to_string(),
            ));
        }

        Ok(Self {
            archive_path: archive_path.to_path_buf(),
            mappings: Vec::new(),
            force_overwrite: false,
        })
    }

    /// Route entries below `archive_prefix` into `destination`
    ///
    /// The destination is created if missing. Mapping a prefix that is
    /// already registered (compared case-insensitively) replaces its
    /// destination but keeps its original position.
    pub fn map_folder(
        &mut self,
        archive_prefix: &str,
        destination: impl AsRef<Path>,
    ) -> BackupResult<&mut Self> {
        let prefix = archive_prefix.replace('\\', "/").trim_matches('/').to_string();
        let destination = destination.as_ref();

        fs::create_dir_all(destination).map_err(|e| {
            BackupError::Io(format!(
                "Failed to create destination {}: {}",
                destination.display(),
                e
            ))
        })?;
        let destination = std::path::absolute(destination)?;

        let key = prefix.to_lowercase();
        match self
            .mappings
            .iter_mut()
            .find(|m| m.archive_prefix.to_lowercase() == key)
        {
            Some(existing) => existing.destination = destination,
            None => self.mappings.push(FolderMapping {
                archive_prefix: prefix,
                destination,
            }),
        }

        Ok(self)
    }

    /// Replace files that already exist at the destination
    pub fn force_overwrite(&mut self, force: bool) -> &mut Self {
        self.force_overwrite = force;
        self
    }

    /// Registered mappings in registration order
    pub fn mappings(&self) -> &[FolderMapping] {
        &self.mappings
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Stream the archive and write every mapped file entry
    pub fn extract(&self) -> BackupResult<ExtractReport> {
        let file = File::open(&self.archive_path).map_err(|e| {
            BackupError::Io(format!(
                "Failed to open archive {}: {}",
                self.archive_path.display(),
                e
            ))
        })?;
        let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
        let mut report = ExtractReport::default();

        let entries = archive
            .entries()
            .map_err(|e| BackupError::Archive(format!("Failed to read archive: {}", e)))?;

        for entry in entries {
            let mut entry = entry
                .map_err(|e| BackupError::Archive(format!("Failed to read entry: {}", e)))?;

            let entry_type = entry.header().entry_type();
            if entry_type.is_dir() {
                continue;
            }

            let entry_path = normalize_entry_name(&String::from_utf8_lossy(&entry.path_bytes()));

            if !matches!(entry_type, EntryType::Regular | EntryType::Continuous) {
                warn!("Skipping unsupported archive entry: {}", entry_path);
                report.skipped_unsupported += 1;
                continue;
            }

            let Some((mapping, relative)) = self.resolve(&entry_path) else {
                warn!("Skipping unmapped archive path: {}", entry_path);
                report.skipped_unmapped += 1;
                continue;
            };

            if !is_safe_relative_path(relative) {
                warn!("Skipping archive path outside its destination: {}", entry_path);
                report.skipped_unsafe += 1;
                continue;
            }

            let destination_file = mapping.destination.join(relative);
            if let Some(parent) = destination_file.parent() {
                fs::create_dir_all(parent)?;
            }

            if destination_file.exists() && !self.force_overwrite {
                info!("Skipping already existing file: {}", destination_file.display());
                report.skipped_existing += 1;
                continue;
            }

            let mut output = File::create(&destination_file).map_err(|e| {
                BackupError::Io(format!(
                    "Failed to create {}: {}",
                    destination_file.display(),
                    e
                ))
            })?;
            io::copy(&mut entry, &mut output).map_err(|e| {
                BackupError::Io(format!(
                    "Failed to restore {}: {}",
                    destination_file.display(),
                    e
                ))
            })?;

            info!("Extracted {} to {}", entry_path, destination_file.display());
            report.extracted += 1;
        }

        debug!("Extraction of {} finished: {}", self.archive_path.display(), report.summary());
        Ok(report)
    }

    /// First mapping, in registration order, whose prefix contains the entry
    ///
    /// Overlapping prefixes are not ranked by length: `a` registered before
    /// `a/b` captures `a/b/file` too.
    fn resolve<'p>(&self, entry_path: &'p str) -> Option<(&FolderMapping, &'p str)> {
        self.mappings.iter().find_map(|mapping| {
            strip_prefix_ignore_case(entry_path, &mapping.archive_prefix)
                .map(|relative| (mapping, relative))
        })
    }
}

/// Remainder of `path` after `prefix/`, ignoring case
///
/// Case folding can change byte lengths, so every `/` in `path` is tried as
/// the end of the prefix.
fn strip_prefix_ignore_case<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    let prefix = prefix.to_lowercase();
    path.match_indices('/')
        .map(|(i, _)| i)
        .find(|&i| path[..i].to_lowercase() == prefix)
        .map(|i| &path[i + 1..])
}

fn is_safe_relative_path(relative: &str) -> bool {
    let path = Path::new(relative);
    path.components().next().is_some()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveBuilder;
    use crate::testing::capture_logs;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// Build an archive from `(entry name, contents)` pairs
    fn build_archive(dir: &Path, files: &[(&str, &str)]) -> PathBuf {
        let staging = dir.join("staging");
        let mut builder = ArchiveBuilder::new();
        for (i, (name, contents)) in files.iter().enumerate() {
            let source = staging.join(format!("file-{}", i));
            write_file(&source, contents);
            builder.add_file(&source, Some(name)).unwrap();
        }
        let output = dir.join("test-20250101000000.tar.gz");
        builder.save(&output).unwrap();
        output
    }

    fn collect_files(root: &Path) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<(String, Vec<u8>)> = walkdir::WalkDir::new(root)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().to_string();
                (rel, fs::read(e.path()).unwrap())
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_open_missing_archive() {
        let temp = TempDir::new().unwrap();
        let err = ArchiveExtractor::open(temp.path().join("nope.tar.gz")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_map_folder_normalizes_and_creates() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &[("docs/a.txt", "a")]);
        let target = temp.path().join("restore").join("docs");

        let mut extractor = ArchiveExtractor::open(&archive).unwrap();
        extractor.map_folder("\\docs\\", &target).unwrap();

        assert!(target.is_dir());
        assert_eq!(extractor.mappings()[0].archive_prefix, "docs");
    }

    #[test]
    fn test_map_folder_overwrites_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &[("docs/a.txt", "a")]);

        let mut extractor = ArchiveExtractor::open(&archive).unwrap();
        extractor.map_folder("docs", temp.path().join("one")).unwrap();
        extractor.map_folder("other", temp.path().join("two")).unwrap();
        extractor.map_folder("DOCS", temp.path().join("three")).unwrap();

        let mappings = extractor.mappings();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].archive_prefix, "docs");
        assert_eq!(mappings[0].destination, temp.path().join("three"));
    }

    #[test]
    fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("data");
        write_file(&source.join("a.txt"), "alpha");
        write_file(&source.join("sub").join("b.bin"), "\u{0}\u{1}binary");
        write_file(&source.join("sub").join("deeper").join("c.md"), "# c");
        write_file(&source.join("empty.txt"), "");

        let mut builder = ArchiveBuilder::new();
        builder.add_directory(&source, Some("data")).unwrap();
        let archive = temp.path().join("data-20250101000000.tar.gz");
        builder.save(&archive).unwrap();

        let restored = temp.path().join("restored");
        let mut extractor = ArchiveExtractor::open(&archive).unwrap();
        extractor.map_folder("data", &restored).unwrap();
        let report = extractor.extract().unwrap();

        assert_eq!(report.extracted, 4);
        assert_eq!(report.skipped(), 0);
        assert_eq!(collect_files(&source), collect_files(&restored));
    }

    #[test]
    fn test_existing_file_kept_without_force() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &[("docs/a.txt", "from archive")]);
        let target = temp.path().join("target");
        write_file(&target.join("a.txt"), "local edit");

        let mut extractor = ArchiveExtractor::open(&archive).unwrap();
        extractor.map_folder("docs", &target).unwrap();
        let report = extractor.extract().unwrap();

        assert_eq!(report.skipped_existing, 1);
        assert_eq!(report.extracted, 0);
        assert_eq!(fs::read_to_string(target.join("a.txt")).unwrap(), "local edit");
    }

    #[test]
    fn test_existing_file_replaced_with_force() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &[("docs/a.txt", "from archive")]);
        let target = temp.path().join("target");
        write_file(&target.join("a.txt"), "local edit that is longer");

        let mut extractor = ArchiveExtractor::open(&archive).unwrap();
        extractor.map_folder("docs", &target).unwrap().force_overwrite(true);
        let report = extractor.extract().unwrap();

        assert_eq!(report.extracted, 1);
        assert_eq!(fs::read_to_string(target.join("a.txt")).unwrap(), "from archive");
    }

    #[test]
    fn test_unmapped_entries_skipped() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(
            temp.path(),
            &[("docs/a.txt", "a"), ("photos/b.jpg", "b"), ("docsx/c.txt", "c")],
        );
        let target = temp.path().join("target");

        let mut extractor = ArchiveExtractor::open(&archive).unwrap();
        extractor.map_folder("docs", &target).unwrap();
        let report = extractor.extract().unwrap();

        assert_eq!(report.extracted, 1);
        assert_eq!(report.skipped_unmapped, 2);
        assert_eq!(
            collect_files(&target),
            vec![("a.txt".to_string(), b"a".to_vec())]
        );
    }

    #[test]
    fn test_unmapped_entry_is_logged_as_warning() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &[("docs/a.txt", "a"), ("photos/b.jpg", "b")]);

        let mut extractor = ArchiveExtractor::open(&archive).unwrap();
        extractor.map_folder("docs", temp.path().join("target")).unwrap();
        let (report, logs) = capture_logs(|| extractor.extract().unwrap());

        assert_eq!(report.skipped_unmapped, 1);
        assert!(logs
            .lines()
            .any(|line| line.contains("WARN") && line.contains("Skipping unmapped archive path: photos/b.jpg")));
    }

    #[test]
    fn test_prefix_match_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &[("Docs/Sub/a.txt", "a")]);
        let target = temp.path().join("target");

        let mut extractor = ArchiveExtractor::open(&archive).unwrap();
        extractor.map_folder("docs/sub", &target).unwrap();
        extractor.extract().unwrap();

        assert!(target.join("a.txt").exists());
    }

    #[test]
    fn test_first_registered_mapping_wins() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &[("a/b/file.txt", "x")]);
        let broad = temp.path().join("broad");
        let narrow = temp.path().join("narrow");

        let mut extractor = ArchiveExtractor::open(&archive).unwrap();
        extractor.map_folder("a", &broad).unwrap();
        extractor.map_folder("a/b", &narrow).unwrap();
        extractor.extract().unwrap();

        assert!(broad.join("b").join("file.txt").exists());
        assert!(!narrow.join("file.txt").exists());
    }

    #[test]
    fn test_strip_prefix_ignore_case() {
        assert_eq!(strip_prefix_ignore_case("srv/docs/a.txt", "SRV/docs"), Some("a.txt"));
        assert_eq!(strip_prefix_ignore_case("srv/docs", "srv/docs"), None);
        assert_eq!(strip_prefix_ignore_case("srv/docsx/a", "srv/docs"), None);
        assert_eq!(strip_prefix_ignore_case("a.txt", ""), None);
        assert_eq!(strip_prefix_ignore_case("ÉTÉ/Ölbilder/a.txt", "été/ölbilder"), Some("a.txt"));
    }

    #[test]
    fn test_non_ascii_prefix_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(temp.path(), &[("Fotos/ÜBERSICHT/a.txt", "a")]);
        let target = temp.path().join("target");

        let mut extractor = ArchiveExtractor::open(&archive).unwrap();
        extractor.map_folder("fotos/übersicht", temp.path().join("first")).unwrap();
        extractor.map_folder("FOTOS/Übersicht", &target).unwrap();
        assert_eq!(extractor.mappings().len(), 1);

        let report = extractor.extract().unwrap();
        assert_eq!(report.extracted, 1);
        assert!(target.join("a.txt").exists());
    }

    #[test]
    fn test_is_safe_relative_path() {
        assert!(is_safe_relative_path("a/b.txt"));
        assert!(!is_safe_relative_path(""));
        assert!(!is_safe_relative_path("../escape.txt"));
        assert!(!is_safe_relative_path("a/../../escape.txt"));
    }
}
