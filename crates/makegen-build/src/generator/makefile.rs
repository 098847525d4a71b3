use super::LocalGenerator;
use crate::check::CHECK_FILE_NAME;
use crate::context::GenerationContext;
use crate::error::BuildResult;
use crate::graph::TargetGraph;
use crate::paths::slash_string;
use crate::remote::jump_and_build_rules;
use crate::rules::{MakeRule, RuleWriter, MAKEFILE_NAME};
use std::path::Path;

impl LocalGenerator<'_> {
    /// Write the directory makefile
    pub(super) fn write_makefile(
        &self,
        graph: &TargetGraph<'_>,
        rule_files: &[String],
        ctx: &mut GenerationContext,
    ) -> BuildResult<()> {
        let mut writer = RuleWriter::new(&self.converter, &self.settings);
        writer.disclaimer();
        self.write_make_variables(&mut writer)?;
        self.write_special_targets_top(&mut writer);
        self.write_all_rules(&mut writer, graph);

        if !rule_files.is_empty() {
            writer
                .divider()
                .comments(&["Include rule files for each target in this directory."]);
            for rule_file in rule_files {
                writer.include(rule_file);
            }
            writer.line("");
        }

        let jumps = jump_and_build_rules(ctx, &self.dir.binary_dir, &self.settings, &self.converter);
        if !jumps.is_empty() {
            writer.divider().comments(&[
                "Targets to make sure needed libraries exist.",
                "These will jump to other directories to build targets.",
            ]);
            for rule in &jumps {
                writer.rule(rule);
            }
        }

        self.write_special_targets_bottom(&mut writer);
        self.install(MAKEFILE_NAME, &writer.finish(), ctx)
    }

    fn write_make_variables(&self, writer: &mut RuleWriter<'_>) -> BuildResult<()> {
        let command = self
            .converter
            .output_for_existing(Path::new(self.makegen_command(MAKEFILE_NAME)?));
        let dir = self.dir;

        writer
            .divider()
            .comments(&["Set environment variables for the build."]);
        if self.settings.windows_shell {
            writer
                .line("!IF \"$(OS)\" == \"Windows_NT\"")
                .line("NULL=")
                .line("!ELSE")
                .line("NULL=nul")
                .line("!ENDIF");
        } else {
            writer
                .line("# The shell in which to execute make rules.")
                .line("SHELL = /bin/sh")
                .line("");
        }

        writer
            .line("# The makegen executable.")
            .line(&format!("MAKEGEN_COMMAND = {}", command))
            .line("")
            .line("# The command to remove a file.")
            .line(&format!("RM = {} remove -f", command))
            .line("");

        if let Some(edit) = dir.definitions.get_non_empty("EDIT_COMMAND") {
            writer
                .line("# The program to use to edit the cache.")
                .line(&format!(
                    "EDIT_COMMAND = {}",
                    self.converter.output_for_existing(Path::new(edit))
                ))
                .line("");
        }

        let relative = |path: &Path| self.converter.relative_output(&slash_string(path));
        writer
            .line("# The source directory corresponding to this makefile.")
            .line(&format!("CURRENT_SOURCE = {}", relative(&dir.source_dir)))
            .line("")
            .line("# The build directory corresponding to this makefile.")
            .line(&format!("CURRENT_BINARY = {}", relative(&dir.binary_dir)))
            .line("")
            .line("# The top-level source directory on which makegen was run.")
            .line(&format!("SOURCE_DIR = {}", relative(&dir.home_source_dir)))
            .line("")
            .line("# The top-level build directory on which makegen was run.")
            .line(&format!("BINARY_DIR = {}", relative(&dir.home_binary_dir)))
            .line("");
        Ok(())
    }

    fn write_special_targets_top(&self, writer: &mut RuleWriter<'_>) {
        writer
            .divider()
            .comments(&["Special targets provided by makegen."]);

        let binary_dir = slash_string(&self.dir.binary_dir);
        // `all` must come first so that make without arguments runs it.
        writer.rule(
            &MakeRule::new("all")
                .with_comment("Default target executed when no arguments are given to make.")
                .with_pre_echo(format!("Entering directory {}", binary_dir))
                .with_post_echo(format!("Finished directory {}", binary_dir))
                .with_depend("check_build_system")
                .with_commands(vec![
                    self.settings.recursive_make_call("all.depends"),
                    self.settings.recursive_make_call("all.build"),
                ]),
        );

        writer.rule(
            &MakeRule::new("check_build_system")
                .with_comment("Special rule to run makegen to check the build system integrity.")
                .with_pre_echo("Checking build system integrity...")
                .with_commands(vec![format!(
                    "@$(MAKEGEN_COMMAND) check-build-system -S$(SOURCE_DIR) -B$(BINARY_DIR) {}",
                    self.converter.shell_path(CHECK_FILE_NAME)
                )]),
        );

        writer.rule(
            &MakeRule::new("rebuild_cache")
                .with_comment("Special rule to re-run makegen using make.")
                .with_pre_echo("Running makegen to regenerate build system...")
                .with_commands(vec![
                    "$(MAKEGEN_COMMAND) generate -S$(SOURCE_DIR) -B$(BINARY_DIR)".to_string(),
                ]),
        );

        let edit_rule = if self.dir.definitions.get_non_empty("EDIT_COMMAND").is_some() {
            MakeRule::new("edit_cache")
                .with_pre_echo("Running makegen cache editor...")
                .with_commands(vec!["$(EDIT_COMMAND) -S$(SOURCE_DIR) -B$(BINARY_DIR)".to_string()])
        } else {
            MakeRule::new("edit_cache")
                .with_pre_echo("Listing cached definitions...")
                .with_commands(vec!["$(MAKEGEN_COMMAND) cache -B$(BINARY_DIR)".to_string()])
        };
        writer.rule(&edit_rule.with_comment("Special rule to edit the makegen cache using make."));
    }

    fn write_all_rules(&self, writer: &mut RuleWriter<'_>, graph: &TargetGraph<'_>) {
        writer
            .divider()
            .comments(&["Main rules for this directory."]);
        writer.rule(
            &MakeRule::new("all.depends")
                .with_comment("Main dependencies target for this directory.")
                .with_depends(graph.all_depends.clone()),
        );
        writer.rule(
            &MakeRule::new("all.build")
                .with_comment("Main build target for this directory.")
                .with_depends(graph.all_build.clone()),
        );
    }

    fn write_special_targets_bottom(&self, writer: &mut RuleWriter<'_>) {
        writer
            .divider()
            .comments(&["Special targets to cleanup operation of make."]);

        // Must follow `all` because VERBOSE changes the target name.
        if !self.dir.definitions.is_on("VERBOSE_MAKEFILE") {
            writer.rule(
                &MakeRule::new("$(VERBOSE).SILENT")
                    .with_comment("Suppress display of executed commands."),
            );
        }
        writer.rule(
            &MakeRule::new(".SUFFIXES")
                .with_comment("Disable some common implicit rules to speed things up.")
                .with_depend(".hpux_make_must_have_this_dependency_here"),
        );
    }
}
