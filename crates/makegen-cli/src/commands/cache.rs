//! Cache command - list cached definitions

use anyhow::{Context, Result};
use makegen_config::DefinitionCache;
use std::path::Path;

/// Print every cached definition as `KEY=VALUE`
pub fn run(build: &Path) -> Result<()> {
    let cache = DefinitionCache::load(build)
        .with_context(|| format!("Failed to load definition cache in {}", build.display()))?;

    if cache.is_empty() {
        println!("No cached definitions in {}", build.display());
        return Ok(());
    }
    for (key, value) in &cache.entries {
        println!("{}={}", key, value);
    }
    Ok(())
}
