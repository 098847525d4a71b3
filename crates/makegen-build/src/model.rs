//! Project model consumed by one generation pass
//!
//! The model is an immutable snapshot built from the loaded configuration:
//! absolute directories, merged definitions and the targets of each directory.

use crate::error::{BuildError, BuildResult};
use crate::paths::collapse_full_path;
use crate::targets::{SourceFile, TargetKind, TargetUnit};
use makegen_config::{Config, DirectoryManifest};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whether a definition value means "true"
pub fn is_on(value: &str) -> bool {
    let upper = value.trim().to_ascii_uppercase();
    match upper.as_str() {
        "ON" | "YES" | "TRUE" | "Y" => true,
        _ => upper.parse::<i64>().map(|n| n != 0).unwrap_or(false),
    }
}

/// Split a `;`-separated list, dropping empty elements
pub fn expand_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Key/value definitions for one directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definitions {
    values: BTreeMap<String, String>,
}

impl Definitions {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Get a definition
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Get a definition that is set to a non-empty value
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    /// Get a definition or a fallback
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Get a definition the unit cannot be generated without
    pub fn get_required(&self, name: &str, unit: &str) -> BuildResult<&str> {
        self.get_non_empty(name)
            .ok_or_else(|| BuildError::missing_definition(unit, name))
    }

    /// Whether a definition holds a true value
    pub fn is_on(&self, name: &str) -> bool {
        self.get(name).map(is_on).unwrap_or(false)
    }

    /// Get a definition as a `;`-separated list
    pub fn list(&self, name: &str) -> Vec<String> {
        self.get(name).map(expand_list).unwrap_or_default()
    }

    /// Set a definition
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Build type in upper case, if one is selected
    pub fn build_type(&self) -> Option<String> {
        self.get_non_empty("BUILD_TYPE")
            .map(|bt| bt.to_ascii_uppercase())
    }

    /// Iterate over all definitions in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Definitions {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// One directory of the project with everything needed to generate its makefile
#[derive(Debug, Clone)]
pub struct DirectoryModel {
    /// Path relative to the project root
    pub relative_path: PathBuf,
    /// Absolute source directory
    pub source_dir: PathBuf,
    /// Absolute binary directory (where the makefile is written)
    pub binary_dir: PathBuf,
    /// Absolute top-level source directory
    pub home_source_dir: PathBuf,
    /// Absolute top-level binary directory
    pub home_binary_dir: PathBuf,
    /// Absolute include search path
    pub include_directories: Vec<PathBuf>,
    /// Absolute library search path
    pub link_directories: Vec<PathBuf>,
    /// Merged definitions
    pub definitions: Definitions,
    /// Targets sorted by name
    pub targets: Vec<TargetUnit>,
}

impl DirectoryModel {
    /// Create an empty directory model rooted at the given source and binary directories
    pub fn new(source_dir: impl Into<PathBuf>, binary_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        let binary_dir = binary_dir.into();
        Self {
            relative_path: PathBuf::from("."),
            home_source_dir: source_dir.clone(),
            home_binary_dir: binary_dir.clone(),
            source_dir,
            binary_dir,
            include_directories: Vec::new(),
            link_directories: Vec::new(),
            definitions: Definitions::default(),
            targets: Vec::new(),
        }
    }

    /// Set the top-level directories
    pub fn with_home(mut self, source: impl Into<PathBuf>, binary: impl Into<PathBuf>) -> Self {
        self.home_source_dir = source.into();
        self.home_binary_dir = binary.into();
        self
    }

    /// Add a target, keeping targets sorted by name
    pub fn with_target(mut self, target: TargetUnit) -> Self {
        self.targets.push(target);
        self.targets.sort_by(|a, b| a.name.cmp(&b.name));
        self
    }

    /// Add an include directory
    pub fn with_include_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_directories.push(dir.into());
        self
    }

    /// Set a definition
    pub fn with_definition(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.definitions.set(name, value);
        self
    }

    /// Find a target by name
    pub fn target(&self, name: &str) -> Option<&TargetUnit> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Explicit library output directory (`LIBRARY_OUTPUT_PATH`), if set
    pub fn library_output_path(&self) -> Option<PathBuf> {
        self.output_path("LIBRARY_OUTPUT_PATH")
    }

    /// Directory executables are written to
    pub fn executable_output_dir(&self) -> PathBuf {
        self.output_path("EXECUTABLE_OUTPUT_PATH")
            .unwrap_or_else(|| self.binary_dir.clone())
    }

    /// Directory libraries of this directory are written to
    pub fn library_output_dir(&self) -> PathBuf {
        self.library_output_path()
            .unwrap_or_else(|| self.binary_dir.clone())
    }

    fn output_path(&self, name: &str) -> Option<PathBuf> {
        self.definitions
            .get_non_empty(name)
            .map(|p| collapse_full_path(Path::new(p), &self.binary_dir))
    }
}

/// Where a project target lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLocation {
    /// Binary directory of the owning directory
    pub binary_dir: PathBuf,
    /// Target kind
    pub kind: TargetKind,
}

/// Project-wide lookup of targets by name
#[derive(Debug, Clone, Default)]
pub struct TargetIndex {
    targets: BTreeMap<String, TargetLocation>,
}

impl TargetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every target of the given directories
    pub fn from_directories(directories: &[DirectoryModel]) -> Self {
        let mut index = Self::new();
        for dir in directories {
            for target in &dir.targets {
                index.insert(&target.name, &dir.binary_dir, target.kind);
            }
        }
        index
    }

    /// Register a target
    pub fn insert(&mut self, name: &str, binary_dir: &Path, kind: TargetKind) {
        self.targets.insert(
            name.to_string(),
            TargetLocation {
                binary_dir: binary_dir.to_path_buf(),
                kind,
            },
        );
    }

    /// Look a target up by name
    pub fn lookup(&self, name: &str) -> Option<&TargetLocation> {
        self.targets.get(name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// The whole project as seen by one generation pass
#[derive(Debug, Clone)]
pub struct ProjectModel {
    /// Project name
    pub name: String,
    /// Absolute top-level source directory
    pub home_source_dir: PathBuf,
    /// Absolute top-level binary directory
    pub home_binary_dir: PathBuf,
    /// Files the generated build system was produced from
    pub list_files: Vec<PathBuf>,
    /// Directories in manifest order
    pub directories: Vec<DirectoryModel>,
    /// Target lookup
    pub index: TargetIndex,
}

impl ProjectModel {
    /// Build the model from a loaded configuration and a build root
    pub fn from_config(config: &Config, build_root: &Path) -> BuildResult<Self> {
        let cwd = std::env::current_dir()?;
        let home_source_dir = collapse_full_path(config.project_root(), &cwd);
        let home_binary_dir = collapse_full_path(build_root, &cwd);

        let mut manifests: Vec<DirectoryManifest> = config.manifest.directories.clone();
        if manifests.is_empty() {
            manifests.push(DirectoryManifest::default());
        }

        let mut directories = Vec::with_capacity(manifests.len());
        for manifest in &manifests {
            let definitions = Definitions::new(config.effective_definitions(manifest));
            directories.push(directory_from_manifest(
                manifest,
                definitions,
                &home_source_dir,
                &home_binary_dir,
            ));
        }

        let index = TargetIndex::from_directories(&directories);
        debug!(
            source = %home_source_dir.display(),
            binary = %home_binary_dir.display(),
            directories = directories.len(),
            targets = index.len(),
            "built project model"
        );
        let list_files = vec![collapse_full_path(&config.manifest_path, &cwd)];

        Ok(Self {
            name: config.project_name().to_string(),
            home_source_dir,
            home_binary_dir,
            list_files,
            directories,
            index,
        })
    }
}

fn directory_from_manifest(
    manifest: &DirectoryManifest,
    definitions: Definitions,
    home_source_dir: &Path,
    home_binary_dir: &Path,
) -> DirectoryModel {
    let source_dir = collapse_full_path(&manifest.path, home_source_dir);
    let binary_dir = collapse_full_path(&manifest.path, home_binary_dir);

    let mut targets: Vec<TargetUnit> = manifest
        .targets
        .iter()
        .map(|t| {
            let sources = t
                .sources
                .iter()
                .map(|s| {
                    let mut source = SourceFile::new(collapse_full_path(s.path(), &source_dir))
                        .with_header_only(s.header_only())
                        .with_custom_command(s.custom_command())
                        .with_object_depends(
                            s.object_depends()
                                .iter()
                                .map(|d| collapse_full_path(d, &source_dir))
                                .collect(),
                        );
                    if let Some(flags) = s.compile_flags() {
                        source = source.with_compile_flags(flags);
                    }
                    source
                })
                .collect();

            TargetUnit {
                name: t.name.clone(),
                kind: t.kind.into(),
                sources,
                link_libraries: t.link_libraries.clone(),
                properties: t.properties.clone(),
                in_all: t.in_all,
            }
        })
        .collect();
    targets.sort_by(|a, b| a.name.cmp(&b.name));

    DirectoryModel {
        relative_path: manifest.path.clone(),
        include_directories: manifest
            .include_directories
            .iter()
            .map(|d| collapse_full_path(d, &source_dir))
            .collect(),
        link_directories: manifest
            .link_directories
            .iter()
            .map(|d| collapse_full_path(d, &source_dir))
            .collect(),
        source_dir,
        binary_dir,
        home_source_dir: home_source_dir.to_path_buf(),
        home_binary_dir: home_binary_dir.to_path_buf(),
        definitions,
        targets,
    }
}
