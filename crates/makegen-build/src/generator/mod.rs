//! Makefile generation for a project
//!
//! Each directory is generated by a [`LocalGenerator`]. It writes one rule
//! file per object, one per target, the directory makefile and the check
//! file. A unit that fails is recorded in the report and the rest of the
//! directory is still generated.

mod makefile;
mod object_rules;
mod target_rules;

use crate::check::{BuildSystemCheck, CHECK_FILE_NAME};
use crate::context::{GenerationContext, GenerationReport};
use crate::error::{BuildError, BuildResult};
use crate::graph::TargetGraphBuilder;
use crate::install::install_if_different;
use crate::model::{DirectoryModel, ProjectModel, TargetIndex};
use crate::paths::PathConverter;
use crate::remote::JumpStrategy;
use crate::rules::{MakeSettings, MAKEFILE_NAME};
use makegen_config::DefinitionCache;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Generator for one directory of the project
pub struct LocalGenerator<'a> {
    dir: &'a DirectoryModel,
    index: &'a TargetIndex,
    converter: PathConverter,
    settings: MakeSettings,
}

impl<'a> LocalGenerator<'a> {
    pub fn new(dir: &'a DirectoryModel, index: &'a TargetIndex) -> Self {
        let settings = MakeSettings::from_definitions(&dir.definitions);
        Self {
            dir,
            index,
            converter: PathConverter::new(&dir.binary_dir, settings.windows_shell),
            settings,
        }
    }

    /// Generate every file of the directory
    ///
    /// `inputs` are the files the build system is generated from; they are
    /// recorded in the check file.
    pub fn generate(&self, inputs: &[PathBuf]) -> GenerationReport {
        let mut ctx = GenerationContext::new(JumpStrategy::from_definitions(&self.dir.definitions));

        if let Err(e) = std::fs::create_dir_all(&self.dir.binary_dir) {
            ctx.report.record_failure(
                self.unit_name(),
                BuildError::io(&self.dir.binary_dir, e),
            );
            return ctx.report;
        }

        let graph = TargetGraphBuilder::new(self.index).build(self.dir, &mut ctx);

        let mut rule_files = Vec::new();
        for node in &graph.nodes {
            let mut objects = Vec::new();
            for object in &node.objects {
                match self.write_object_rule_file(node, object, &mut ctx) {
                    Ok(()) => objects.push(object),
                    Err(e) => ctx.report.record_failure(&object.object_path, e),
                }
            }

            match self.write_target_rule_file(node, &objects, &mut ctx) {
                Ok(()) => rule_files.push(node.target.rule_file()),
                Err(e) => ctx.report.record_failure(&node.target.name, e),
            }
        }

        let makefile = self.dir.binary_dir.join(MAKEFILE_NAME);
        if let Err(e) = self.write_makefile(&graph, &rule_files, &mut ctx) {
            ctx.report.record_failure(self.unit_name(), e);
            return ctx.report;
        }

        if let Err(e) = self.write_check_file(&makefile, inputs, &mut ctx) {
            ctx.report.record_failure(self.unit_name(), e);
        }

        debug!(
            dir = %self.dir.binary_dir.display(),
            written = ctx.report.written.len(),
            unchanged = ctx.report.unchanged,
            failures = ctx.report.failures.len(),
            "generated directory"
        );
        ctx.report
    }

    fn write_check_file(
        &self,
        makefile: &Path,
        inputs: &[PathBuf],
        ctx: &mut GenerationContext,
    ) -> BuildResult<()> {
        let path = self.dir.binary_dir.join(CHECK_FILE_NAME);
        let check = BuildSystemCheck::new(
            makefile,
            inputs.iter().cloned(),
            vec![makefile.to_path_buf()],
            ctx.check_depends.iter().cloned(),
        );
        let outcome = check.write(&path)?;
        ctx.report.record_install(&path, outcome);
        check.touch_outputs()
    }

    /// Install a file named relative to the binary directory
    fn install(&self, local: &str, text: &str, ctx: &mut GenerationContext) -> BuildResult<()> {
        let path = self.converter.full_path(local);
        let outcome = install_if_different(&path, text)?;
        ctx.report.record_install(&path, outcome);
        Ok(())
    }

    fn makegen_command(&self, unit: &str) -> BuildResult<&str> {
        self.dir.definitions.get_required("MAKEGEN_COMMAND", unit)
    }

    fn unit_name(&self) -> String {
        crate::paths::slash_string(&self.dir.binary_dir)
    }
}

/// Generate every directory of a project
///
/// The build-system inputs are the project's list files and the definition
/// cache of the build tree.
pub fn generate_project(project: &ProjectModel) -> GenerationReport {
    let mut inputs = project.list_files.clone();
    inputs.push(DefinitionCache::path_in(&project.home_binary_dir));

    let mut report = GenerationReport::default();
    for dir in &project.directories {
        let local = LocalGenerator::new(dir, &project.index);
        report.merge(local.generate(&inputs));
    }

    info!(
        project = %project.name,
        directories = project.directories.len(),
        written = report.written.len(),
        unchanged = report.unchanged,
        failures = report.failures.len(),
        "generation finished"
    );
    report
}
