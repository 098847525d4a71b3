//! Definition cache (MakegenCache.toml)
//!
//! Persists user-supplied definition overrides in the build tree so that
//! `rebuild_cache` regenerates with the same settings.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the cache file in the build root
pub const CACHE_FILE_NAME: &str = "MakegenCache.toml";

const CACHE_HEADER: &str = "# This is the makegen definition cache.\n\
# Entries here override definitions from makegen.toml.\n\n";

/// Cached definitions
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DefinitionCache {
    /// Cached entries
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

impl DefinitionCache {
    /// Path of the cache file for a build root
    pub fn path_in(build_root: &Path) -> PathBuf {
        build_root.join(CACHE_FILE_NAME)
    }

    /// Load the cache from a build root; a missing file is an empty cache
    pub fn load(build_root: &Path) -> ConfigResult<Self> {
        let path = Self::path_in(build_root);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::IoError(e)),
        };

        toml::from_str(&content).map_err(|e| ConfigError::TomlParseError { file: path, error: e })
    }

    /// Save the cache into a build root
    pub fn save(&self, build_root: &Path) -> ConfigResult<PathBuf> {
        let path = Self::path_in(build_root);
        let body = toml::to_string(self).map_err(|e| ConfigError::TomlSerializeError {
            file: path.clone(),
            error: e,
        })?;

        std::fs::create_dir_all(build_root)?;
        std::fs::write(&path, format!("{}{}", CACHE_HEADER, body))?;
        Ok(path)
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
