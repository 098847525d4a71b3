//! makegen configuration
//!
//! Provides the project model consumed by the rule generator:
//! - Project manifest (`makegen.toml`) describing directories and targets
//! - Definition cache (`MakegenCache.toml`) holding user overrides in the build tree
//! - Configuration precedence and merging
//!
//! # Definition precedence
//!
//! Definitions are merged in the following order (later overrides earlier):
//! 1. Project-wide `[definitions]` in makegen.toml
//! 2. Per-directory `[directory.definitions]`
//! 3. Cached overrides (MakegenCache.toml)
//! 4. Environment variables (MAKEGEN_*) and CLI `-D` flags
//!
//! # Example
//!
//! ```no_run
//! use makegen_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! ```

pub mod cache;
pub mod loader;
pub mod manifest;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Failed to serialize {file}: {error}")]
    TomlSerializeError {
        file: PathBuf,
        error: toml::ser::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate target '{name}' (first declared in '{first}', again in '{second}')")]
    DuplicateTarget {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Invalid definition override '{0}': expected KEY=VALUE")]
    InvalidOverride(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use cache::DefinitionCache;
pub use loader::{Config, ConfigLoader, MANIFEST_FILE_NAME};
pub use manifest::{
    DirectoryManifest, ProjectManifest, ProjectSection, SourceSpec, TargetKindSpec,
    TargetManifest,
};
