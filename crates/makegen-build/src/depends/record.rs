//! Persisted dependency records

use crate::error::BuildResult;
use crate::install::{install_if_different, remove_if_exists, replace_file};
use crate::paths::slash_string;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Mark file for an owner artifact
pub fn mark_file_name(owner: &str) -> String {
    format!("{}.depends", owner)
}

/// Record file for an owner artifact
pub fn record_file_name(owner: &str) -> String {
    format!("{}.depends.make", owner)
}

/// Escape a path for use as a make prerequisite
pub fn escape_make_path(path: &str) -> String {
    path.replace(' ', "\\ ")
}

/// Undo [`escape_make_path`]
pub fn unescape_make_path(path: &str) -> String {
    path.replace("\\ ", " ")
}

/// Text of a record that holds no dependencies yet
pub fn empty_record_text(owner: &str) -> String {
    format!(
        "# Empty dependencies file for {}.\n# This may be replaced when dependencies are built.\n",
        owner
    )
}

/// Remove the mark file and install an empty record for `owner`
pub fn write_empty_record(directory: &Path, owner: &str) -> BuildResult<()> {
    remove_if_exists(&directory.join(mark_file_name(owner)))?;
    replace_file(&directory.join(record_file_name(owner)), &empty_record_text(owner))?;
    debug!(owner, "wrote empty dependency record");
    Ok(())
}

/// The files one artifact depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyRecord {
    /// Owner path, relative to the directory the record is written in
    pub owner: String,
    /// Dependee paths in sorted order
    pub dependees: BTreeSet<PathBuf>,
}

impl DependencyRecord {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            dependees: BTreeSet::new(),
        }
    }

    /// Add a dependee
    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.dependees.insert(path.into())
    }

    /// Whether `path` is a dependee
    pub fn contains(&self, path: &Path) -> bool {
        self.dependees.contains(path)
    }

    pub fn len(&self) -> usize {
        self.dependees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependees.is_empty()
    }

    /// Render the record file text
    pub fn render(&self) -> String {
        let mark = mark_file_name(&self.owner);
        let deps: Vec<String> = self
            .dependees
            .iter()
            .map(|d| escape_make_path(&slash_string(d)))
            .collect();

        let mut out = format!("# Dependencies for {}\n", self.owner);
        for dep in &deps {
            out.push_str(&format!("{}: {}\n", self.owner, dep));
        }
        out.push('\n');
        out.push_str(&format!("# Dependencies for {}\n", mark));
        for dep in &deps {
            out.push_str(&format!("{}: {}\n", mark, dep));
        }
        out
    }

    /// Write the record file, then touch the mark file
    ///
    /// The mark file is only written once the record is in place.
    pub fn write(&self, directory: &Path) -> BuildResult<()> {
        install_if_different(&directory.join(record_file_name(&self.owner)), &self.render())?;
        replace_file(
            &directory.join(mark_file_name(&self.owner)),
            &format!("Dependencies updated for {}\n", self.owner),
        )?;
        Ok(())
    }
}
