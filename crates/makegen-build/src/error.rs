/// Rule generation error types
use makegen_config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Configuration error in '{unit}': {reason}")]
    Configuration { unit: String, reason: String },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dependency scanning is not supported for language '{0}'")]
    UnsupportedScanLanguage(String),

    #[error("Invalid check file {path}: {reason}")]
    InvalidCheckFile { path: PathBuf, reason: String },

    #[error("Invalid project: {0}")]
    InvalidProject(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BuildError {
    /// Create a configuration error for a unit
    pub fn configuration(unit: impl Into<String>, reason: impl ToString) -> Self {
        Self::Configuration {
            unit: unit.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create an error for a source whose language cannot be identified
    pub fn unknown_language(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        Self::Configuration {
            unit: source.display().to_string(),
            reason: "source file has unknown type".to_string(),
        }
    }

    /// Create an error for a required definition that is not set
    pub fn missing_definition(unit: impl Into<String>, name: &str) -> Self {
        Self::Configuration {
            unit: unit.into(),
            reason: format!("required definition '{}' is not set", name),
        }
    }

    /// Create an invalid check file error
    pub fn invalid_check_file(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InvalidCheckFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error only affects one unit of a generation pass
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
