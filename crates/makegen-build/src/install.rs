//! Atomic installation of generated files
//!
//! Generated files are written to a sibling temporary file and renamed into
//! place, so an interrupted pass leaves either the old file or the new one.

use crate::error::{BuildError, BuildResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result of installing a generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The file was created or its content replaced
    Written,
    /// The existing file already had the same content
    Unchanged,
}

/// Install `content` at `path` only if it differs from what is there.
///
/// Leaving identical files untouched keeps their timestamps stable, which
/// matters because generated rules depend on their own rule files.
pub fn install_if_different(path: &Path, content: &str) -> BuildResult<InstallOutcome> {
    match fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => return Ok(InstallOutcome::Unchanged),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(BuildError::io(path, e)),
    }

    replace_file(path, content)?;
    Ok(InstallOutcome::Written)
}

/// Atomically replace `path` with `content`, updating its timestamp
pub fn replace_file(path: &Path, content: &str) -> BuildResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
    }

    let temp_path = temp_path_for(path);
    {
        let mut file = fs::File::create(&temp_path).map_err(|e| BuildError::io(&temp_path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| BuildError::io(&temp_path, e))?;
        file.sync_all().map_err(|e| BuildError::io(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        BuildError::io(path, e)
    })
}

/// Remove a file, treating a missing file as success
pub fn remove_if_exists(path: &Path) -> BuildResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BuildError::io(path, e)),
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
