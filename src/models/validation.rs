//! Unit validation
//!
//! Checks a unit for structural and semantic problems before any archive is
//! written or restored. Validation is fail-slow: every check runs and every
//! violation is collected.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::unit::{normalize_source_path, Unit};

/// Maximum length of a unit name
pub const MAX_UNIT_NAME_LENGTH: usize = 30;

const UNIT_NAME_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_\-]*$";

fn unit_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(UNIT_NAME_PATTERN).expect("unit name pattern is valid"))
}

/// A single human-readable validation violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Stateless validator for a single unit
pub struct UnitValidator<'a> {
    unit: &'a Unit,
}

impl<'a> UnitValidator<'a> {
    pub fn new(unit: &'a Unit) -> Self {
        Self { unit }
    }

    /// Run every check and return all violations in check order
    ///
    /// An empty list means the unit is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        self.check_unit_name(&mut errors);
        self.check_sources(&mut errors);
        self.check_excludes(&mut errors);
        self.check_destination(&mut errors);
        self.check_keep_last_backups(&mut errors);
        errors
    }

    fn check_unit_name(&self, errors: &mut Vec<ValidationError>) {
        let name = &self.unit.name;
        if !unit_name_regex().is_match(name) {
            errors.push(ValidationError::new(format!(
                "Unit name must start with a letter and contain only alphanumeric characters, underscores and minuses: '{}'",
                name
            )));
        }
        if name.chars().count() > MAX_UNIT_NAME_LENGTH {
            errors.push(ValidationError::new(format!(
                "Unit name is too long. It must be at most {} characters: '{}'",
                MAX_UNIT_NAME_LENGTH, name
            )));
        }
    }

    fn check_sources(&self, errors: &mut Vec<ValidationError>) {
        let sources = &self.unit.sources;
        if sources.is_empty() {
            errors.push(ValidationError::new("Sources cannot be empty."));
            return;
        }

        let resolved: Vec<PathBuf> = sources.iter().map(|s| resolve(s)).collect();

        for (i, source) in sources.iter().enumerate() {
            if !source.is_absolute() {
                errors.push(ValidationError::new(format!(
                    "Source path is not absolute: {}",
                    source.display()
                )));
            }

            if !source.exists() {
                errors.push(ValidationError::new(format!(
                    "Source path does not exist: {}",
                    source.display()
                )));
            }

            let base = &resolved[i];
            for (j, other) in resolved.iter().enumerate() {
                if i == j {
                    continue;
                }
                if is_nested(base, other) {
                    errors.push(ValidationError::new(format!(
                        "Sources must not be nested in each other: {} ; {}",
                        base.display(),
                        other.display()
                    )));
                }
            }
        }
    }

    fn check_excludes(&self, errors: &mut Vec<ValidationError>) {
        for ext in &self.unit.excluded_extensions {
            if !ext.starts_with('.') {
                errors.push(ValidationError::new(format!(
                    "Extension must start with a '.': {}",
                    ext
                )));
            }
        }
    }

    fn check_destination(&self, errors: &mut Vec<ValidationError>) {
        let destination = &self.unit.destination;
        if !destination.is_absolute() {
            errors.push(ValidationError::new(format!(
                "Destination path is not absolute: {}",
                destination.display()
            )));
        }

        if !destination.exists() {
            errors.push(ValidationError::new(format!(
                "Destination path does not exist: {}",
                destination.display()
            )));
        }
    }

    fn check_keep_last_backups(&self, errors: &mut Vec<ValidationError>) {
        if self.unit.keep_last_backups < 1 {
            errors.push(ValidationError::new(
                "keepLastBackups must be greater than zero.",
            ));
        }
    }
}

/// Make a path absolute and resolve `.`/`..` without touching the filesystem
fn resolve(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize_source_path(&absolute)
}

/// True if `other` lies strictly below `base`
///
/// The comparison is component-wise, so trailing separators are ignored and
/// `/data` does not contain `/database`.
fn is_nested(base: &Path, other: &Path) -> bool {
    other != base && other.starts_with(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_valid_unit() -> (Unit, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("data");
        let destination = temp_dir.path().join("backups");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&destination).unwrap();

        let unit = Unit::new("documents", vec![source], destination);
        (unit, temp_dir)
    }

    #[test]
    fn test_valid_unit() {
        let (unit, _temp) = create_valid_unit();
        assert!(UnitValidator::new(&unit).validate().is_empty());
    }

    #[test]
    fn test_invalid_unit_names() {
        let (mut unit, _temp) = create_valid_unit();

        for name in ["1docs", "docs!", "", "my docs", "_docs"] {
            unit.name = name.to_string();
            let errors = UnitValidator::new(&unit).validate();
            assert_eq!(errors.len(), 1, "name {:?} should fail", name);
        }

        for name in ["a", "Docs_2024", "home-dir"] {
            unit.name = name.to_string();
            assert!(UnitValidator::new(&unit).validate().is_empty());
        }
    }

    #[test]
    fn test_unit_name_length() {
        let (mut unit, _temp) = create_valid_unit();

        unit.name = "a".repeat(MAX_UNIT_NAME_LENGTH);
        assert!(UnitValidator::new(&unit).validate().is_empty());

        unit.name = "a".repeat(MAX_UNIT_NAME_LENGTH + 1);
        let errors = UnitValidator::new(&unit).validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("too long"));
    }

    #[test]
    fn test_empty_sources_reports_single_error() {
        let (mut unit, _temp) = create_valid_unit();
        unit.sources.clear();

        let errors = UnitValidator::new(&unit).validate();
        assert_eq!(errors, vec![ValidationError::new("Sources cannot be empty.")]);
    }

    #[test]
    fn test_relative_and_missing_source() {
        let (mut unit, temp) = create_valid_unit();
        unit.sources = vec![
            PathBuf::from("relative/dir"),
            temp.path().join("does-not-exist"),
        ];

        let errors = UnitValidator::new(&unit).validate();
        let messages: Vec<&str> = errors.iter().map(|e| e.message()).collect();

        assert_eq!(errors.len(), 3);
        assert!(messages[0].starts_with("Source path is not absolute"));
        assert!(messages[1].starts_with("Source path does not exist"));
        assert!(messages[2].starts_with("Source path does not exist"));
    }

    #[test]
    fn test_nested_sources() {
        let (mut unit, temp) = create_valid_unit();
        let data = temp.path().join("data");
        let sub = data.join("sub");
        fs::create_dir_all(&sub).unwrap();
        unit.sources = vec![data, sub];

        let errors = UnitValidator::new(&unit).validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("nested"));
    }

    #[test]
    fn test_nested_sources_reversed_order() {
        let (mut unit, temp) = create_valid_unit();
        let data = temp.path().join("data");
        let deep = data.join("a").join("b");
        fs::create_dir_all(&deep).unwrap();
        unit.sources = vec![deep, data];

        let errors = UnitValidator::new(&unit).validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("nested"));
    }

    #[test]
    fn test_nested_sources_through_dot_dot() {
        let (mut unit, temp) = create_valid_unit();
        let data = temp.path().join("data");
        let other = temp.path().join("other");
        fs::create_dir_all(data.join("sub")).unwrap();
        fs::create_dir_all(&other).unwrap();
        unit.sources = vec![data, other.join("..").join("data").join("sub")];

        let errors = UnitValidator::new(&unit).validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("nested"));
    }

    #[test]
    fn test_negative_keep_last_backups() {
        let (mut unit, _temp) = create_valid_unit();
        unit.keep_last_backups = -1;

        let errors = UnitValidator::new(&unit).validate();
        assert_eq!(
            errors,
            vec![ValidationError::new("keepLastBackups must be greater than zero.")]
        );
    }

    #[test]
    fn test_sibling_sources_are_valid() {
        let (mut unit, temp) = create_valid_unit();
        let a = temp.path().join("data").join("a");
        let b = temp.path().join("data").join("b");
        let ab = temp.path().join("data").join("ab");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::create_dir_all(&ab).unwrap();
        unit.sources = vec![a, b, ab];

        assert!(UnitValidator::new(&unit).validate().is_empty());
    }

    #[test]
    fn test_is_nested_ignores_trailing_separator() {
        assert!(is_nested(Path::new("/data/"), Path::new("/data/sub")));
        assert!(!is_nested(Path::new("/data"), Path::new("/data/")));
        assert!(!is_nested(Path::new("/data"), Path::new("/database")));
    }

    #[test]
    fn test_excludes_need_leading_dot() {
        let (mut unit, _temp) = create_valid_unit();
        unit.excluded_extensions = vec![".log".into(), "tmp".into(), "bak".into()];

        let errors = UnitValidator::new(&unit).validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message(), "Extension must start with a '.': tmp");
    }

    #[test]
    fn test_destination_checks() {
        let (mut unit, _temp) = create_valid_unit();
        unit.destination = PathBuf::from("backups");

        let errors = UnitValidator::new(&unit).validate();
        assert!(errors
            .iter()
            .any(|e| e.message().starts_with("Destination path is not absolute")));
    }

    #[test]
    fn test_keep_last_backups_zero() {
        let (mut unit, _temp) = create_valid_unit();
        unit.keep_last_backups = 0;

        let errors = UnitValidator::new(&unit).validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("keepLastBackups"));
    }

    #[test]
    fn test_collects_all_errors() {
        let (mut unit, _temp) = create_valid_unit();
        unit.name = "9lives".into();
        unit.sources.clear();
        unit.excluded_extensions = vec!["log".into()];
        unit.destination = PathBuf::from("nowhere");
        unit.keep_last_backups = 0;

        let errors = UnitValidator::new(&unit).validate();
        // name, sources, excludes, destination (relative + missing), retention
        assert_eq!(errors.len(), 6);
        assert_eq!(errors[1].message(), "Sources cannot be empty.");
    }
}
