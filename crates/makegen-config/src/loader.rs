//! Configuration Loader
//!
//! Finds the project manifest and merges definitions from every source with proper precedence.

use crate::cache::DefinitionCache;
use crate::manifest::{DirectoryManifest, ProjectManifest};
use crate::{ConfigError, ConfigResult};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the project manifest file
pub const MANIFEST_FILE_NAME: &str = "makegen.toml";

/// Configuration loader
///
/// Loads the project manifest and collects definition overrides:
/// 1. Manifest definitions (project-wide, then per directory) - lowest priority
/// 2. Cached definitions (MakegenCache.toml) - overrides the manifest
/// 3. Environment variables (MAKEGEN_*) - overrides the cache
/// 4. CLI `-D` flags - highest priority (applied by the caller via [`Config::set_override`])
pub struct ConfigLoader {
    /// Read environment overrides while loading
    read_env: bool,
}

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project manifest
    pub manifest: ProjectManifest,

    /// Project root directory (where makegen.toml was found)
    pub project_root: PathBuf,

    /// Path of the manifest file
    pub manifest_path: PathBuf,

    /// Definitions restored from the build tree cache
    pub cached: BTreeMap<String, String>,

    /// Environment and command line overrides
    pub overrides: BTreeMap<String, String>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { read_env: true }
    }

    /// Create a loader that ignores MAKEGEN_* environment variables
    pub fn without_env() -> Self {
        Self { read_env: false }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find makegen.toml.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let mut current = start_dir.to_path_buf();

        loop {
            let manifest_path = current.join(MANIFEST_FILE_NAME);
            if manifest_path.is_file() {
                return self.load_from_file(&manifest_path);
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Err(ConfigError::NotFound(start_dir.join(MANIFEST_FILE_NAME))),
            }
        }
    }

    /// Load configuration from a specific manifest file
    pub fn load_from_file(&self, manifest_path: &Path) -> ConfigResult<Config> {
        let manifest = ProjectManifest::load_from_file(manifest_path)?;
        let project_root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        debug!(
            manifest = %manifest_path.display(),
            directories = manifest.directories.len(),
            targets = manifest.target_count(),
            "loaded project manifest"
        );

        let mut config = Config {
            manifest,
            project_root,
            manifest_path: manifest_path.to_path_buf(),
            cached: BTreeMap::new(),
            overrides: BTreeMap::new(),
        };

        if self.read_env {
            apply_env_overrides(&mut config);
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply environment variable overrides
///
/// MAKEGEN_BUILD_TYPE=<type> sets BUILD_TYPE, MAKEGEN_VERBOSE=<bool> sets VERBOSE_MAKEFILE.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(build_type) = env::var("MAKEGEN_BUILD_TYPE") {
        if !build_type.is_empty() {
            config
                .overrides
                .insert("BUILD_TYPE".to_string(), build_type);
        }
    }

    if let Ok(verbose) = env::var("MAKEGEN_VERBOSE") {
        let on = matches!(verbose.to_lowercase().as_str(), "true" | "1" | "yes" | "on");
        config.overrides.insert(
            "VERBOSE_MAKEFILE".to_string(),
            if on { "ON" } else { "OFF" }.to_string(),
        );
    }
}

impl Config {
    /// Get the project name
    pub fn project_name(&self) -> &str {
        &self.manifest.project.name
    }

    /// Get the project root directory
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Merge cached definitions under the current overrides
    pub fn apply_cache(&mut self, cache: &DefinitionCache) {
        self.cached
            .extend(cache.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Parse and apply a `KEY=VALUE` override
    pub fn set_override(&mut self, spec: &str) -> ConfigResult<()> {
        let (key, value) = spec
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidOverride(spec.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::InvalidOverride(spec.to_string()));
        }
        self.overrides.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Definitions a directory is generated with, after all overrides
    pub fn effective_definitions(&self, dir: &DirectoryManifest) -> BTreeMap<String, String> {
        let mut defs = self.manifest.definitions.clone();
        defs.extend(dir.definitions.iter().map(|(k, v)| (k.clone(), v.clone())));
        defs.extend(self.cached.iter().map(|(k, v)| (k.clone(), v.clone())));
        defs.extend(self.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        defs
    }

    /// Entries persisted to the definition cache: everything the user overrode
    pub fn cache_entries(&self) -> BTreeMap<String, String> {
        let mut entries = self.cached.clone();
        entries.extend(self.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        entries
    }
}
