//! Generate command - write the makefiles of a project into a build tree

use anyhow::{bail, Context, Result};
use makegen_build::{generate_project, ProjectModel};
use makegen_config::{ConfigLoader, DefinitionCache};
use std::path::PathBuf;
use tracing::debug;

/// Generate command arguments
pub struct GenerateArgs {
    /// Directory the manifest search starts from
    pub source: PathBuf,
    /// Build directory
    pub build: PathBuf,
    /// `KEY=VALUE` definition overrides
    pub defines: Vec<String>,
}

/// Run the generate command
pub fn run(args: GenerateArgs) -> Result<()> {
    let mut config = ConfigLoader::new()
        .load_from_directory(&args.source)
        .with_context(|| format!("Failed to load project from {}", args.source.display()))?;

    let cache = DefinitionCache::load(&args.build).context("Failed to load definition cache")?;
    config.apply_cache(&cache);
    for spec in &args.defines {
        config.set_override(spec)?;
    }

    // The check file lists the cache as an input, so it is saved on every run.
    let cache = DefinitionCache {
        entries: config.cache_entries(),
    };
    let cache_path = cache
        .save(&args.build)
        .context("Failed to save definition cache")?;
    debug!(cache = %cache_path.display(), entries = cache.entries.len(), "saved definition cache");

    if !config.manifest.definitions.contains_key("MAKEGEN_COMMAND") {
        let exe = std::env::current_exe().context("Failed to locate the makegen executable")?;
        config
            .manifest
            .definitions
            .insert("MAKEGEN_COMMAND".to_string(), exe.display().to_string());
    }

    let project = ProjectModel::from_config(&config, &args.build)
        .context("Failed to build the project model")?;
    let report = generate_project(&project);

    for failure in &report.failures {
        eprintln!("error: {}: {}", failure.unit, failure.error);
    }
    if !report.is_success() {
        bail!(
            "Generation failed for {} unit(s); build files may be incomplete",
            report.failures.len()
        );
    }

    println!(
        "Generated {} directories ({} files written, {} unchanged)",
        project.directories.len(),
        report.written.len(),
        report.unchanged
    );
    println!(
        "Build files have been written to: {}",
        project.home_binary_dir.display()
    );
    Ok(())
}
