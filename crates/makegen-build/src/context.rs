//! State threaded through one generation pass

use crate::error::BuildError;
use crate::install::InstallOutcome;
use crate::remote::{JumpStrategy, RemoteTargetRef};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A generation unit that could not be written
#[derive(Debug)]
pub struct UnitFailure {
    /// Object, target or directory the failure belongs to
    pub unit: String,
    pub error: BuildError,
}

/// Summary of a generation pass
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub failures: Vec<UnitFailure>,
    /// Files whose content changed
    pub written: Vec<PathBuf>,
    /// Files left untouched because their content matched
    pub unchanged: usize,
}

impl GenerationReport {
    /// Record a unit that failed; the rest of the pass continues
    pub fn record_failure(&mut self, unit: impl Into<String>, error: BuildError) {
        let unit = unit.into();
        warn!(unit = %unit, error = %error, "skipping unit");
        self.failures.push(UnitFailure { unit, error });
    }

    /// Record the outcome of installing one generated file
    pub fn record_install(&mut self, path: &Path, outcome: InstallOutcome) {
        match outcome {
            InstallOutcome::Written => self.written.push(path.to_path_buf()),
            InstallOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: GenerationReport) {
        self.failures.extend(other.failures);
        self.written.extend(other.written);
        self.unchanged += other.unchanged;
    }

    /// No unit failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Mutable state for generating one directory
#[derive(Debug)]
pub struct GenerationContext {
    /// Artifacts whose dependency records are checked before every build
    pub check_depends: BTreeSet<String>,
    /// Targets of other directories this directory needs, by name
    pub remote_targets: BTreeMap<String, RemoteTargetRef>,
    pub strategy: JumpStrategy,
    pub report: GenerationReport,
}

impl GenerationContext {
    pub fn new(strategy: JumpStrategy) -> Self {
        Self {
            check_depends: BTreeSet::new(),
            remote_targets: BTreeMap::new(),
            strategy,
            report: GenerationReport::default(),
        }
    }

    /// Register an artifact for the build-system dependency check
    pub fn register_check_depend(&mut self, artifact: impl Into<String>) {
        self.check_depends.insert(artifact.into());
    }

    /// Register a remote target, returning the existing entry if there is one
    pub fn remote_target(&mut self, name: &str, binary_dir: &Path, file_path: &Path) -> &RemoteTargetRef {
        self.remote_targets
            .entry(name.to_string())
            .or_insert_with(|| RemoteTargetRef {
                name: name.to_string(),
                binary_dir: binary_dir.to_path_buf(),
                file_path: file_path.to_path_buf(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let mut report = GenerationReport::default();
        report.record_install(Path::new("/b/Makefile.makegen"), InstallOutcome::Written);
        report.record_install(Path::new("/b/a.make"), InstallOutcome::Unchanged);
        assert!(report.is_success());

        let mut other = GenerationReport::default();
        other.record_failure("t.dir/a.o", BuildError::configuration("t", "no compiler"));
        report.merge(other);

        assert_eq!(report.written, vec![PathBuf::from("/b/Makefile.makegen")]);
        assert_eq!(report.unchanged, 1);
        assert!(!report.is_success());
        assert_eq!(report.failures[0].unit, "t.dir/a.o");
    }

    #[test]
    fn test_remote_target_first_registration_wins() {
        let mut ctx = GenerationContext::new(JumpStrategy::Chained);
        ctx.remote_target("foo", Path::new("/b/lib"), Path::new("/b/lib/libfoo.so"));
        let again = ctx.remote_target("foo", Path::new("/elsewhere"), Path::new("/x"));

        assert_eq!(again.binary_dir, PathBuf::from("/b/lib"));
        assert_eq!(ctx.remote_targets.len(), 1);
    }
}
