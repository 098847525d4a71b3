//! Dependency commands - include scanning and record validation

use anyhow::{bail, Context, Result};
use makegen_build::paths::collapse_full_path;
use makegen_build::{DependencyIntegrityChecker, DependencyScanner};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Depends command arguments
pub struct DependsArgs {
    /// Directory the object is named relative to
    pub directory: PathBuf,
    pub language: String,
    pub object: String,
    pub source: PathBuf,
    pub include_path: Vec<PathBuf>,
}

/// Scan one object's includes and write its record
///
/// A relative source is taken relative to `directory`, so the record
/// names it by its full path like every other dependee.
pub fn run(args: DependsArgs) -> Result<()> {
    let scanner = DependencyScanner::for_language(&args.language, args.include_path)?;
    let source = collapse_full_path(&args.source, &args.directory);
    let record = scanner
        .scan_and_write(&args.directory, &args.object, &source)
        .with_context(|| format!("Failed to write dependencies of {}", args.object))?;
    info!(object = %args.object, dependees = record.len(), "dependencies updated");
    Ok(())
}

/// Check the records of several artifacts
///
/// Every artifact is checked before a failure is reported.
pub fn check(directory: &Path, artifacts: &[String]) -> Result<()> {
    let results =
        DependencyIntegrityChecker::check_all(directory, artifacts.iter().map(String::as_str));

    let mut failed = 0;
    for (artifact, result) in &results {
        match result {
            Ok(outcome) => {
                if !outcome.missing.is_empty() {
                    println!(
                        "Dependencies of {} changed ({} missing), record reset",
                        artifact,
                        outcome.missing.len()
                    );
                }
                for path in &outcome.failed_removals {
                    warn!(artifact = %artifact, path = %path.display(), "stale artifact left in place");
                }
            }
            Err(e) => {
                eprintln!("error: cannot check dependencies of {}: {}", artifact, e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("Failed to check {} dependency record(s)", failed);
    }
    Ok(())
}
