/// Build targets, their sources and the object units derived from them
use makegen_config::TargetKindSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Kind of build target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    /// Executable program
    Executable,
    /// Static archive
    StaticLibrary,
    /// Shared library that other targets link against
    SharedLibrary,
    /// Loadable module
    ModuleLibrary,
}

impl TargetKind {
    /// Whether this target produces a library
    pub fn is_library(&self) -> bool {
        !matches!(self, Self::Executable)
    }

    /// Whether objects of this target are built position independent and exported
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::SharedLibrary | Self::ModuleLibrary)
    }

    /// Name of the create-rule definition suffix for this kind
    pub fn link_rule_suffix(&self) -> &'static str {
        match self {
            Self::Executable => "LINK_EXECUTABLE",
            Self::StaticLibrary => "CREATE_STATIC_LIBRARY",
            Self::SharedLibrary => "CREATE_SHARED_LIBRARY",
            Self::ModuleLibrary => "CREATE_SHARED_MODULE",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Executable => write!(f, "executable"),
            Self::StaticLibrary => write!(f, "static library"),
            Self::SharedLibrary => write!(f, "shared library"),
            Self::ModuleLibrary => write!(f, "shared module"),
        }
    }
}

impl From<TargetKindSpec> for TargetKind {
    fn from(spec: TargetKindSpec) -> Self {
        match spec {
            TargetKindSpec::Executable => Self::Executable,
            TargetKindSpec::StaticLibrary => Self::StaticLibrary,
            TargetKindSpec::SharedLibrary => Self::SharedLibrary,
            TargetKindSpec::ModuleLibrary => Self::ModuleLibrary,
        }
    }
}

/// A source file of a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path
    pub full_path: PathBuf,
    /// Header-only sources are never compiled
    pub header_only: bool,
    /// Sources generated by a custom command are never compiled here
    pub has_custom_command: bool,
    /// Extra compile flags
    pub compile_flags: Option<String>,
    /// Extra files the object depends on
    pub object_depends: Vec<PathBuf>,
}

impl SourceFile {
    pub fn new(full_path: impl Into<PathBuf>) -> Self {
        Self {
            full_path: full_path.into(),
            header_only: false,
            has_custom_command: false,
            compile_flags: None,
            object_depends: Vec::new(),
        }
    }

    pub fn with_header_only(mut self, header_only: bool) -> Self {
        self.header_only = header_only;
        self
    }

    pub fn with_custom_command(mut self, has_custom_command: bool) -> Self {
        self.has_custom_command = has_custom_command;
        self
    }

    pub fn with_compile_flags(mut self, flags: impl Into<String>) -> Self {
        self.compile_flags = Some(flags.into());
        self
    }

    pub fn with_object_depends(mut self, depends: Vec<PathBuf>) -> Self {
        self.object_depends = depends;
        self
    }

    /// Extension without the leading dot ("" when there is none)
    pub fn extension(&self) -> &str {
        self.full_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
    }

    /// Source path string
    pub fn path_str(&self) -> String {
        crate::paths::slash_string(&self.full_path)
    }
}

/// A build target of one directory
#[derive(Debug, Clone, PartialEq)]
pub struct TargetUnit {
    /// Target name (unique within the project)
    pub name: String,
    /// Target kind
    pub kind: TargetKind,
    /// Ordered source files
    pub sources: Vec<SourceFile>,
    /// Ordered link-library references
    pub link_libraries: Vec<String>,
    /// Property bag
    pub properties: BTreeMap<String, String>,
    /// Part of the directory's `all` target
    pub in_all: bool,
}

impl TargetUnit {
    /// Create a new target
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            sources: Vec::new(),
            link_libraries: Vec::new(),
            properties: BTreeMap::new(),
            in_all: true,
        }
    }

    /// Add a source file
    pub fn with_source(mut self, source: SourceFile) -> Self {
        self.sources.push(source);
        self
    }

    /// Add a link-library reference
    pub fn with_link_library(mut self, library: impl Into<String>) -> Self {
        self.link_libraries.push(library.into());
        self
    }

    /// Set a property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set whether the target is part of `all`
    pub fn with_in_all(mut self, in_all: bool) -> Self {
        self.in_all = in_all;
        self
    }

    /// Get a non-empty property value
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Whether a property holds a true value
    pub fn property_is_on(&self, key: &str) -> bool {
        self.property(key).map(crate::model::is_on).unwrap_or(false)
    }

    /// Directory holding this target's objects and rule files
    pub fn directory(&self) -> String {
        format!("{}.dir", self.name)
    }

    /// Base name used for the target's dependency record
    pub fn depends_base(&self) -> String {
        format!("{}.dir/{}", self.name, self.name)
    }

    /// Rule file for the target
    pub fn rule_file(&self) -> String {
        format!("{}.make", self.depends_base())
    }

    /// Mark file aggregated by `all.depends`
    pub fn depends_mark(&self) -> String {
        format!("{}.depends", self.depends_base())
    }

    /// Requirements target aggregated by `all.build`
    pub fn requires_target(&self) -> String {
        format!("{}.requires", self.name)
    }
}

/// One compiled source of a target
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectUnit {
    /// Owning target name
    pub target: String,
    /// Source being compiled
    pub source: SourceFile,
    /// Resolved source language
    pub language: String,
    /// Object path relative to the binary directory
    pub object_path: String,
}

impl ObjectUnit {
    /// Rule file for the object
    pub fn rule_file(&self) -> String {
        format!("{}.make", self.object_path)
    }

    /// Mark file written by the dependency scanner
    pub fn mark_file(&self) -> String {
        format!("{}.depends", self.object_path)
    }

    /// Record file written by the dependency scanner
    pub fn record_file(&self) -> String {
        format!("{}.depends.make", self.object_path)
    }

    /// Directory of the object file relative to the binary directory
    pub fn parent_dir(&self) -> Option<&Path> {
        Path::new(&self.object_path).parent()
    }
}
