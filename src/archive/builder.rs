//! Archive builder
//!
//! Collects the files of a backup and writes them into a gzip-compressed tar
//! archive. Staging and writing are separate: `add_*` calls only record
//! `(source, entry name)` pairs, and `save` streams them out in staging order
//! with a single open source file at a time.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Header, HeaderMode};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::normalize_entry_name;
use crate::error::{BackupError, BackupResult};

/// A file staged for writing into the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path of the file on disk
    pub source: PathBuf,
    /// Name inside the archive, `/`-separated
    pub entry_name: String,
}

/// Counters for a finished `save`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// Regular files written to the archive
    pub files_written: usize,
    /// Uncompressed bytes of file content written
    pub bytes_written: u64,
    /// Symlinks that were left out
    pub skipped_symlinks: usize,
    /// Sockets, FIFOs and other non-regular files that were left out
    pub skipped_special: usize,
}

/// Builder-style accumulator for a `.tar.gz` archive
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<ArchiveEntry>,
    /// Lowercased, dot-prefixed extensions
    excluded_extensions: HashSet<String>,
    follow_symlinks: bool,
    ignore_git_repositories: bool,
}

impl ArchiveBuilder {
    /// Create an empty builder that does not follow symlinks
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a single file
    ///
    /// The entry name defaults to the file's base name. Files whose extension
    /// is excluded are silently not staged.
    pub fn add_file(&mut self, path: &Path, entry_name: Option<&str>) -> BackupResult<&mut Self> {
        let is_file_or_link = fs::symlink_metadata(path)
            .map(|m| m.is_file() || m.file_type().is_symlink())
            .unwrap_or(false);
        if !is_file_or_link {
            return Err(BackupError::file_not_found(path.display().to_string()));
        }

        if self.is_excluded(path) {
            debug!("Excluding {} by extension", path.display());
            return Ok(self);
        }

        let entry_name = match entry_name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string()),
        };

        self.entries.push(ArchiveEntry {
            source: path.to_path_buf(),
            entry_name: normalize_entry_name(&entry_name),
        });
        Ok(self)
    }

    /// Stage every file below a directory
    ///
    /// Entry names are `<archive_prefix>/<relative path>` when a prefix is
    /// given, otherwise the file's full path. Entries are visited in file name
    /// order at each level, so the archive layout is reproducible.
    pub fn add_directory(
        &mut self,
        path: &Path,
        archive_prefix: Option<&str>,
    ) -> BackupResult<&mut Self> {
        if !path.is_dir() {
            return Err(BackupError::directory_not_found(path.display().to_string()));
        }

        let ignore_git = self.ignore_git_repositories;
        let walker = WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !(ignore_git && is_nested_git_repository(entry)));

        for entry in walker {
            let entry = entry?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() && !file_type.is_symlink() {
                info!("Skipping special file: {}", entry.path().display());
                continue;
            }

            let file_path = entry.path();
            let entry_name = match archive_prefix {
                Some(prefix) => {
                    let relative = file_path.strip_prefix(path).unwrap_or(file_path);
                    format!(
                        "{}/{}",
                        prefix.replace('\\', "/").trim_end_matches('/'),
                        relative.to_string_lossy().replace('\\', "/")
                    )
                }
                None => file_path.to_string_lossy().to_string(),
            };

            self.add_file(file_path, Some(&entry_name))?;
        }

        Ok(self)
    }

    /// Register extensions that later `add_*` calls will skip
    ///
    /// Matching is case-insensitive. Files staged before this call are kept.
    pub fn exclude_extensions<I, S>(&mut self, extensions: I) -> BackupResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for ext in extensions {
            let ext = ext.as_ref();
            if !ext.starts_with('.') {
                return Err(BackupError::InvalidExtension(ext.to_string()));
            }
            self.excluded_extensions.insert(ext.to_lowercase());
        }
        Ok(self)
    }

    /// Set the symlink policy used by `save`
    ///
    /// Symlinks are never written to the archive. With `follow` enabled they
    /// are reported as unsupported instead of silently skipped.
    pub fn follow_symlinks(&mut self, follow: bool) -> &mut Self {
        self.follow_symlinks = follow;
        self
    }

    /// Skip directories below the root that contain a `.git` entry
    pub fn ignore_git_repositories(&mut self, ignore: bool) -> &mut Self {
        self.ignore_git_repositories = ignore;
        self
    }

    /// Entries staged so far, in staging order
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Write all staged entries to `output_path`
    ///
    /// A partially written file is removed when writing fails.
    pub fn save(&self, output_path: &Path) -> BackupResult<SaveReport> {
        let file = File::create(output_path).map_err(|e| {
            BackupError::Io(format!(
                "Failed to create archive {}: {}",
                output_path.display(),
                e
            ))
        })?;

        match self.write_archive(file) {
            Ok(report) => Ok(report),
            Err(err) => {
                if let Err(cleanup_err) = fs::remove_file(output_path) {
                    warn!(
                        "Failed removing incomplete archive {}: {}",
                        output_path.display(),
                        cleanup_err
                    );
                }
                Err(err)
            }
        }
    }

    fn write_archive(&self, file: File) -> BackupResult<SaveReport> {
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        let mut tar = tar::Builder::new(encoder);
        let mut report = SaveReport::default();

        for entry in &self.entries {
            let metadata = fs::symlink_metadata(&entry.source).map_err(|e| {
                BackupError::Io(format!("Failed to stat {}: {}", entry.source.display(), e))
            })?;

            if metadata.file_type().is_symlink() {
                if self.follow_symlinks {
                    warn!(
                        "Archiving symlinks is not supported. Skipping symlink: {}",
                        entry.source.display()
                    );
                } else {
                    info!("Skipping symlink: {}", entry.source.display());
                }
                report.skipped_symlinks += 1;
                continue;
            }

            if !metadata.is_file() {
                info!("Skipping special file: {}", entry.source.display());
                report.skipped_special += 1;
                continue;
            }

            let mut header = Header::new_gnu();
            header.set_metadata_in_mode(&metadata, HeaderMode::Complete);

            let source = File::open(&entry.source).map_err(|e| {
                BackupError::Io(format!("Failed to open {}: {}", entry.source.display(), e))
            })?;
            // Never write more than the header announces, even if the file grew
            let data = source.take(metadata.len());

            tar.append_data(&mut header, &entry.entry_name, data)
                .map_err(|e| {
                    BackupError::Archive(format!(
                        "Failed to write entry {}: {}",
                        entry.entry_name, e
                    ))
                })?;

            debug!("Archived {} as {}", entry.source.display(), entry.entry_name);
            report.files_written += 1;
            report.bytes_written += metadata.len();
        }

        let encoder = tar
            .into_inner()
            .map_err(|e| BackupError::Archive(format!("Failed to finish tar stream: {}", e)))?;
        let mut writer = encoder
            .finish()
            .map_err(|e| BackupError::Archive(format!("Failed to finish gzip stream: {}", e)))?;
        writer.flush()?;

        Ok(report)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        dotted_extension(path).map_or(false, |ext| self.excluded_extensions.contains(&ext))
    }
}

/// Lowercased extension including its dot, e.g. `.log`
///
/// Unlike `Path::extension`, a leading-dot name such as `.bashrc` counts as
/// an extension.
fn dotted_extension(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let dot = name.rfind('.')?;
    if dot + 1 == name.len() {
        return None;
    }
    Some(name[dot..].to_lowercase())
}

fn is_nested_git_repository(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_type().is_dir() && entry.path().join(".git").exists()
}
