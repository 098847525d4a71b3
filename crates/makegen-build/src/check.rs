//! Build-system integrity check file
//!
//! Every directory gets a `Makefile.makegen.check` next to its makefile. It
//! lists the files the makefile was generated from, the files generation
//! produced and the artifacts whose dependency records are validated before
//! each build. `make` runs the check through the `check_build_system`
//! target.

use crate::depends::{CheckOutcome, DependencyIntegrityChecker};
use crate::error::{BuildError, BuildResult};
use crate::install::{install_if_different, InstallOutcome};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Name of the check file in every binary directory
pub const CHECK_FILE_NAME: &str = "Makefile.makegen.check";

const HEADER: &str = "# makegen generated file: DO NOT EDIT!\n\
# Inputs and outputs of the makefile in this directory, and the files whose\n\
# dependency integrity is checked before every build.\n\n";

/// Contents of a check file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSystemCheck {
    /// Makefile this check belongs to
    pub makefile: PathBuf,
    /// Files the makefile was generated from
    pub inputs: Vec<PathBuf>,
    /// Files produced by generation
    pub outputs: Vec<PathBuf>,
    /// Artifacts relative to the makefile's directory
    #[serde(default)]
    pub check_depends: Vec<String>,
}

/// Result of checking a build system
#[derive(Debug, Clone, Default)]
pub struct BuildSystemStatus {
    /// Some output is missing or older than an input
    pub regenerate: bool,
    /// Outcome for every checked artifact, in check file order
    pub depends: Vec<(String, CheckOutcome)>,
    /// Artifacts whose record could not be checked or reset
    pub failed: Vec<String>,
}

impl BuildSystemCheck {
    /// Create a check; inputs are sorted and deduplicated
    pub fn new(
        makefile: impl Into<PathBuf>,
        inputs: impl IntoIterator<Item = PathBuf>,
        outputs: Vec<PathBuf>,
        check_depends: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut inputs: Vec<PathBuf> = inputs.into_iter().collect();
        inputs.sort();
        inputs.dedup();
        let mut check_depends: Vec<String> = check_depends.into_iter().collect();
        check_depends.sort();
        check_depends.dedup();

        Self {
            makefile: makefile.into(),
            inputs,
            outputs,
            check_depends,
        }
    }

    /// Render the check file text
    pub fn render(&self) -> BuildResult<String> {
        let body = toml::to_string_pretty(self)
            .map_err(|e| BuildError::invalid_check_file(&self.makefile, e))?;
        Ok(format!("{}{}", HEADER, body))
    }

    /// Install the check file at `path`
    pub fn write(&self, path: &Path) -> BuildResult<InstallOutcome> {
        install_if_different(path, &self.render()?)
    }

    /// Load a check file
    pub fn load(path: &Path) -> BuildResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        toml::from_str(&text).map_err(|e| BuildError::invalid_check_file(path, e))
    }

    /// Whether the makefile must be regenerated
    ///
    /// True when an input or output is missing, or when the oldest output is
    /// older than the newest input.
    pub fn needs_regeneration(&self) -> bool {
        let Some(newest_input) = newest(&self.inputs) else {
            return true;
        };
        let Some(oldest_output) = oldest(&self.outputs) else {
            return true;
        };
        oldest_output < newest_input
    }

    /// Validate the dependency record of every listed artifact
    ///
    /// Each artifact gets its own result; a failure does not skip the rest.
    pub fn check_depends(&self, directory: &Path) -> Vec<(String, BuildResult<CheckOutcome>)> {
        DependencyIntegrityChecker::check_all(
            directory,
            self.check_depends.iter().map(String::as_str),
        )
    }

    /// Mark every output as up to date
    ///
    /// Outputs whose content did not change keep their old timestamps on
    /// install, which would otherwise trigger regeneration on every build.
    pub fn touch_outputs(&self) -> BuildResult<()> {
        let now = SystemTime::now();
        for output in &self.outputs {
            let file = fs::File::options()
                .write(true)
                .open(output)
                .map_err(|e| BuildError::io(output, e))?;
            file.set_modified(now).map_err(|e| BuildError::io(output, e))?;
        }
        Ok(())
    }
}

/// Run the check stored at `check_file`
///
/// Dependency records are validated relative to the check file's directory.
pub fn check_build_system(check_file: &Path) -> BuildResult<BuildSystemStatus> {
    let check = match BuildSystemCheck::load(check_file) {
        Ok(check) => check,
        Err(e) => {
            info!(file = %check_file.display(), error = %e, "check file unusable, regenerating");
            return Ok(BuildSystemStatus {
                regenerate: true,
                ..Default::default()
            });
        }
    };

    let directory = match check_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    let mut depends = Vec::new();
    let mut failed = Vec::new();
    for (artifact, result) in check.check_depends(&directory) {
        match result {
            Ok(outcome) => depends.push((artifact, outcome)),
            Err(e) => {
                warn!(artifact = %artifact, error = %e, "dependency record check failed");
                failed.push(artifact);
            }
        }
    }
    let regenerate = check.needs_regeneration();
    debug!(
        makefile = %check.makefile.display(),
        checked = depends.len(),
        failed = failed.len(),
        regenerate,
        "checked build system"
    );

    Ok(BuildSystemStatus {
        regenerate,
        depends,
        failed,
    })
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn newest(paths: &[PathBuf]) -> Option<SystemTime> {
    paths
        .iter()
        .map(|p| modified(p))
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .max()
}

fn oldest(paths: &[PathBuf]) -> Option<SystemTime> {
    paths
        .iter()
        .map(|p| modified(p))
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .min()
}
