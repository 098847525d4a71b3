//! Check-build-system command - rerun generation when the inputs changed

use super::generate::{self, GenerateArgs};
use anyhow::{Context, Result};
use makegen_build::check_build_system;
use std::path::PathBuf;
use tracing::debug;

/// Check-build-system command arguments
pub struct CheckArgs {
    pub source: PathBuf,
    pub build: PathBuf,
    pub check_file: PathBuf,
}

/// Run the check-build-system command
pub fn run(args: CheckArgs) -> Result<()> {
    let status = check_build_system(&args.check_file)
        .with_context(|| format!("Failed to check {}", args.check_file.display()))?;

    let reset = status
        .depends
        .iter()
        .filter(|(_, outcome)| outcome.regenerate)
        .count();
    debug!(
        checked = status.depends.len(),
        reset,
        failed = status.failed.len(),
        "checked dependency records"
    );

    if status.regenerate {
        println!("Re-running makegen...");
        generate::run(GenerateArgs {
            source: args.source,
            build: args.build,
            defines: Vec::new(),
        })?;
    }
    Ok(())
}
