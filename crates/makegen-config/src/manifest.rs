//! Project Manifest (makegen.toml)
//!
//! Describes every directory of a project, the targets each one builds and
//! the definitions (command templates, flags, platform settings) used when
//! rules are generated.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Project manifest from makegen.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    /// Project metadata
    pub project: ProjectSection,

    /// Project-wide definitions
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, String>,

    /// Directories, each producing one generated makefile
    #[serde(default, rename = "directory")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directories: Vec<DirectoryManifest>,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Project name
    pub name: String,
}

/// One source directory of the project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DirectoryManifest {
    /// Directory path relative to the project root
    #[serde(default = "default_directory_path")]
    pub path: PathBuf,

    /// Include search path (relative to this directory unless absolute)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_directories: Vec<PathBuf>,

    /// Library search path passed to the linker
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub link_directories: Vec<PathBuf>,

    /// Definitions overriding the project-wide ones for this directory
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, String>,

    /// Targets built in this directory
    #[serde(default, rename = "target")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetManifest>,
}

fn default_directory_path() -> PathBuf {
    PathBuf::from(".")
}

impl Default for DirectoryManifest {
    fn default() -> Self {
        Self {
            path: default_directory_path(),
            include_directories: Vec::new(),
            link_directories: Vec::new(),
            definitions: BTreeMap::new(),
            targets: Vec::new(),
        }
    }
}

/// A build target declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TargetManifest {
    /// Target name (unique within the project)
    pub name: String,

    /// Target kind
    pub kind: TargetKindSpec,

    /// Source files, relative to the directory unless absolute
    #[serde(default)]
    pub sources: Vec<SourceSpec>,

    /// Libraries to link: project target names, library names or linker flags
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub link_libraries: Vec<String>,

    /// Whether the target is part of the default `all` build
    #[serde(default = "default_true")]
    pub in_all: bool,

    /// Target properties (VERSION, SOVERSION, LINK_FLAGS, ...)
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

/// Kind of target as written in the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKindSpec {
    Executable,
    StaticLibrary,
    SharedLibrary,
    ModuleLibrary,
}

/// Source file specification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SourceSpec {
    /// Plain path (e.g., "src/main.c")
    Path(PathBuf),

    /// Source with per-file properties
    Detailed {
        /// Source path
        path: PathBuf,

        /// Header-only sources produce no object file
        #[serde(default)]
        header_only: bool,

        /// Sources produced by a custom command produce no object file
        #[serde(default)]
        custom_command: bool,

        /// Extra compile flags for this source
        #[serde(skip_serializing_if = "Option::is_none")]
        compile_flags: Option<String>,

        /// Extra files the object depends on
        #[serde(default)]
        #[serde(skip_serializing_if = "Vec::is_empty")]
        object_depends: Vec<PathBuf>,
    },
}

impl SourceSpec {
    /// Get the source path
    pub fn path(&self) -> &Path {
        match self {
            Self::Path(path) => path,
            Self::Detailed { path, .. } => path,
        }
    }

    /// Whether the source is header-only
    pub fn header_only(&self) -> bool {
        matches!(self, Self::Detailed { header_only: true, .. })
    }

    /// Whether the source is produced by a custom command
    pub fn custom_command(&self) -> bool {
        matches!(
            self,
            Self::Detailed {
                custom_command: true,
                ..
            }
        )
    }

    /// Get the extra compile flags, if any
    pub fn compile_flags(&self) -> Option<&str> {
        match self {
            Self::Path(_) => None,
            Self::Detailed { compile_flags, .. } => compile_flags.as_deref(),
        }
    }

    /// Get the extra object dependencies
    pub fn object_depends(&self) -> &[PathBuf] {
        match self {
            Self::Path(_) => &[],
            Self::Detailed { object_depends, .. } => object_depends,
        }
    }
}

impl ProjectManifest {
    /// Load a project manifest from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let manifest: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> ConfigResult<()> {
        if self.project.name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "project.name".to_string(),
                reason: "name cannot be empty".to_string(),
            });
        }

        let mut seen_dirs = HashMap::new();
        // Target names are looked up project-wide, so they must be unique
        // across directories, not just within one.
        let mut seen_targets: HashMap<&str, &Path> = HashMap::new();

        for dir in &self.directories {
            if dir.path.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    field: "directory.path".to_string(),
                    reason: format!(
                        "'{}' must be relative to the project root",
                        dir.path.display()
                    ),
                });
            }
            if seen_dirs.insert(&dir.path, ()).is_some() {
                return Err(ConfigError::InvalidValue {
                    field: "directory.path".to_string(),
                    reason: format!("'{}' is declared twice", dir.path.display()),
                });
            }

            for target in &dir.targets {
                validate_target(target)?;
                if let Some(first) = seen_targets.insert(&target.name, &dir.path) {
                    return Err(ConfigError::DuplicateTarget {
                        name: target.name.clone(),
                        first: first.to_path_buf(),
                        second: dir.path.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Find the directory declaring a target
    pub fn directory_of(&self, target: &str) -> Option<&DirectoryManifest> {
        self.directories
            .iter()
            .find(|dir| dir.targets.iter().any(|t| t.name == target))
    }

    /// Total number of targets across all directories
    pub fn target_count(&self) -> usize {
        self.directories.iter().map(|d| d.targets.len()).sum()
    }
}

/// Validate a single target declaration
fn validate_target(target: &TargetManifest) -> ConfigResult<()> {
    if target.name.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "target.name".to_string(),
            reason: "name cannot be empty".to_string(),
        });
    }

    if target
        .name
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '\\' || c == ':')
    {
        return Err(ConfigError::InvalidValue {
            field: format!("target '{}'", target.name),
            reason: "name cannot contain whitespace, path separators or ':'".to_string(),
        });
    }

    for source in &target.sources {
        if source.path().as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("target '{}'", target.name),
                reason: "source path cannot be empty".to_string(),
            });
        }
    }

    Ok(())
}
