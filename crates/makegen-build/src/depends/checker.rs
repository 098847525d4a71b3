//! Dependency record integrity checks
//!
//! A record that names a file which no longer exists cannot be trusted: the
//! artifact depending on it is deleted and the record is reset, so the next
//! build rescans and rebuilds exactly what was affected.

use super::record::{record_file_name, unescape_make_path, write_empty_record};
use crate::error::BuildResult;
use crate::install::remove_if_exists;
use crate::paths::{collapse_full_path, is_full_path};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of checking one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    /// The record was reset and must be rebuilt
    pub regenerate: bool,
    /// Dependees that no longer exist
    pub missing: Vec<PathBuf>,
    /// Stale artifacts that were deleted
    pub removed: Vec<PathBuf>,
    /// Stale artifacts that could not be deleted
    pub failed_removals: Vec<PathBuf>,
}

/// Validates dependency records against the filesystem
pub struct DependencyIntegrityChecker;

impl DependencyIntegrityChecker {
    /// Check the record of `artifact`, named relative to `directory`
    pub fn check(directory: &Path, artifact: &str) -> BuildResult<CheckOutcome> {
        let mut outcome = CheckOutcome::default();
        let record_path = directory.join(record_file_name(artifact));

        match std::fs::read(&record_path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                for line in text.lines() {
                    Self::check_line(directory, line, &mut outcome);
                }
            }
            Err(_) => {
                debug!(record = %record_path.display(), "dependency record unreadable");
                outcome.regenerate = true;
            }
        }

        if outcome.regenerate {
            write_empty_record(directory, artifact)?;
            if !outcome.missing.is_empty() {
                info!(
                    artifact,
                    missing = outcome.missing.len(),
                    "dependencies changed, record reset"
                );
            }
        }

        Ok(outcome)
    }

    /// A depender that cannot be removed is reported, never fatal: the record
    /// is still reset so the next build rescans it.
    fn check_line(directory: &Path, line: &str, outcome: &mut CheckOutcome) {
        let line = line.trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'));
        if line.is_empty() || line.starts_with('#') || line.len() < 2 {
            return;
        }

        // Start at offset 2 so a drive-letter colon is not taken as the separator.
        let Some((pos, _)) = line.char_indices().find(|&(i, c)| i >= 2 && c == ':') else {
            return;
        };

        let depender = unescape_make_path(line[..pos].trim());
        let dependee = unescape_make_path(line[pos + 1..].trim());
        if dependee.is_empty() {
            return;
        }

        let dependee_path = resolve(directory, &dependee);
        if dependee_path.exists() {
            return;
        }

        outcome.regenerate = true;
        if !outcome.missing.contains(&dependee_path) {
            outcome.missing.push(dependee_path);
        }

        let depender_path = resolve(directory, &depender);
        if outcome.removed.contains(&depender_path)
            || outcome.failed_removals.contains(&depender_path)
        {
            return;
        }
        match remove_if_exists(&depender_path) {
            Ok(true) => {
                debug!(removed = %depender_path.display(), "removed stale artifact");
                outcome.removed.push(depender_path);
            }
            Ok(false) => {}
            Err(e) => {
                warn!(artifact = %depender_path.display(), error = %e, "cannot remove stale artifact");
                outcome.failed_removals.push(depender_path);
            }
        }
    }

    /// Check several records in the same directory
    ///
    /// Every artifact is checked; one failing record does not stop the rest.
    pub fn check_all<'a>(
        directory: &Path,
        artifacts: impl IntoIterator<Item = &'a str>,
    ) -> Vec<(String, BuildResult<CheckOutcome>)> {
        artifacts
            .into_iter()
            .map(|artifact| (artifact.to_string(), Self::check(directory, artifact)))
            .collect()
    }

    /// Make sure a record exists for `artifact`
    ///
    /// An existing record is checked; a missing one is created empty and any
    /// leftover mark file is removed.
    pub fn ensure_record(directory: &Path, artifact: &str) -> BuildResult<String> {
        let record = record_file_name(artifact);
        if directory.join(&record).exists() {
            Self::check(directory, artifact)?;
        } else {
            write_empty_record(directory, artifact)?;
        }
        Ok(record)
    }
}

fn resolve(directory: &Path, path: &str) -> PathBuf {
    if is_full_path(path) {
        PathBuf::from(path)
    } else {
        collapse_full_path(Path::new(path), directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_record_regenerates() {
        let temp = TempDir::new().unwrap();
        let outcome = DependencyIntegrityChecker::check(temp.path(), "a.o").unwrap();

        assert!(outcome.regenerate);
        assert!(fs::read_to_string(temp.path().join("a.o.depends.make"))
            .unwrap()
            .starts_with("# Empty dependencies file for a.o."));
    }

    #[test]
    fn test_intact_record_left_alone() {
        let temp = TempDir::new().unwrap();
        let header = temp.path().join("h.h");
        fs::write(&header, "").unwrap();
        fs::write(temp.path().join("a.o"), "obj").unwrap();
        fs::write(temp.path().join("a.o.depends"), "mark").unwrap();
        let text = format!("# Dependencies for a.o\na.o: {}\n", header.display());
        fs::write(temp.path().join("a.o.depends.make"), &text).unwrap();

        let outcome = DependencyIntegrityChecker::check(temp.path(), "a.o").unwrap();

        assert!(!outcome.regenerate);
        assert!(temp.path().join("a.o").exists());
        assert!(temp.path().join("a.o.depends").exists());
        assert_eq!(
            fs::read_to_string(temp.path().join("a.o.depends.make")).unwrap(),
            text
        );
    }

    #[test]
    fn test_relative_dependee_resolved_against_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("inc")).unwrap();
        fs::write(temp.path().join("inc/h.h"), "").unwrap();
        fs::write(temp.path().join("a.o.depends.make"), "a.o: inc/h.h\n").unwrap();

        let outcome = DependencyIntegrityChecker::check(temp.path(), "a.o").unwrap();
        assert!(!outcome.regenerate);
    }

    #[test]
    fn test_malformed_lines_ignored() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("a.o.depends.make"),
            "x\n  \n   # comment\nno colon here\n:\n::\nab:\n\u{e9}\u{e9}: \n",
        )
        .unwrap();

        let outcome = DependencyIntegrityChecker::check(temp.path(), "a.o").unwrap();
        assert!(!outcome.regenerate);
    }

    #[test]
    fn test_ensure_record_creates_empty_and_drops_mark() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("t.depends"), "old mark").unwrap();

        let record = DependencyIntegrityChecker::ensure_record(temp.path(), "t").unwrap();

        assert_eq!(record, "t.depends.make");
        assert!(!temp.path().join("t.depends").exists());
        assert!(temp.path().join("t.depends.make").exists());
    }

    #[test]
    fn test_unremovable_depender_still_resets_record() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a.o/inner")).unwrap();
        fs::write(temp.path().join("a.o.depends"), "mark").unwrap();
        fs::write(temp.path().join("a.o.depends.make"), "a.o: /gone/one.h\n").unwrap();

        let outcome = DependencyIntegrityChecker::check(temp.path(), "a.o").unwrap();

        assert!(outcome.regenerate);
        assert_eq!(outcome.missing, vec![PathBuf::from("/gone/one.h")]);
        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.failed_removals, vec![temp.path().join("a.o")]);
        assert!(!temp.path().join("a.o.depends").exists());
        assert!(fs::read_to_string(temp.path().join("a.o.depends.make"))
            .unwrap()
            .starts_with("# Empty dependencies file for a.o."));
    }

    #[test]
    fn test_drive_letter_colon_is_not_the_separator() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.o.depends"), "mark").unwrap();
        fs::write(
            temp.path().join("a.o.depends.make"),
            "C:/obj/a.o: C:/gone.h\n",
        )
        .unwrap();

        let outcome = DependencyIntegrityChecker::check(temp.path(), "a.o").unwrap();

        assert!(outcome.regenerate);
        assert_eq!(outcome.missing, vec![PathBuf::from("C:/gone.h")]);
        assert!(!temp.path().join("a.o.depends").exists());
        assert!(fs::read_to_string(temp.path().join("a.o.depends.make"))
            .unwrap()
            .starts_with("# Empty dependencies file for a.o."));
    }

    #[test]
    fn test_check_all_continues_past_failed_record() {
        let temp = TempDir::new().unwrap();
        // A directory where the record belongs cannot be replaced.
        fs::create_dir_all(temp.path().join("a.o.depends.make/x")).unwrap();
        fs::write(temp.path().join("b.o"), "obj").unwrap();
        fs::write(temp.path().join("b.o.depends.make"), "b.o: gone.h\n").unwrap();

        let results = DependencyIntegrityChecker::check_all(temp.path(), ["a.o", "b.o"]);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "a.o");
        assert!(results[0].1.is_err());
        assert_eq!(results[1].0, "b.o");
        assert!(results[1].1.as_ref().unwrap().regenerate);
        assert!(!temp.path().join("b.o").exists());
    }
}
