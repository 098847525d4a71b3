//! File commands used by generated link rules

use anyhow::{bail, Context, Result};
use makegen_build::create_symlink_chain;
use std::path::{Path, PathBuf};

/// Remove files; with `force`, files that do not exist are skipped
pub fn remove(files: &[PathBuf], force: bool) -> Result<()> {
    let mut failed = 0;
    for file in files {
        match std::fs::remove_file(file) {
            Ok(()) => {}
            Err(e) if force && e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                eprintln!("error: cannot remove {}: {}", file.display(), e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("Failed to remove {} file(s)", failed);
    }
    Ok(())
}

/// Link `so` and `link` to the versioned library `real`
pub fn symlink_library(real: &Path, so: &Path, link: &Path) -> Result<()> {
    create_symlink_chain(real, so, link)
        .with_context(|| format!("Failed to create symlinks for {}", real.display()))
}
