use super::LocalGenerator;
use crate::context::GenerationContext;
use crate::depends::DependencyIntegrityChecker;
use crate::error::BuildResult;
use crate::flags::{executable_link_flags, library_link_flags, link_libraries, object_lists};
use crate::graph::{LibraryOutput, TargetNode};
use crate::paths::slash_string;
use crate::rules::{MakeRule, RuleWriter};
use crate::targets::ObjectUnit;
use crate::variables::{expand_commands, RuleVariables};

impl LocalGenerator<'_> {
    /// Write `<name>.dir/<name>.make`: the target's depends, link and requires rules
    pub(super) fn write_target_rule_file(
        &self,
        node: &TargetNode<'_>,
        objects: &[&ObjectUnit],
        ctx: &mut GenerationContext,
    ) -> BuildResult<()> {
        let target = node.target;
        let record = DependencyIntegrityChecker::ensure_record(&self.dir.binary_dir, &target.depends_base())?;
        let rule_file = target.rule_file();

        let mut depends: Vec<String> = objects.iter().map(|o| o.mark_file()).collect();
        depends.push(rule_file.clone());
        let depends_rule = MakeRule::new(target.depends_mark())
            .with_pre_echo(format!("Building dependencies for {}...", target.name))
            .with_depends(depends);

        let object_paths: Vec<String> = objects.iter().map(|o| o.object_path.clone()).collect();
        let link_rule = match &node.library {
            Some(library) => self.library_rule(node, library, &object_paths, &rule_file)?,
            None => self.executable_rule(node, &object_paths, &rule_file)?,
        };

        let requires_rule = MakeRule::new(target.requires_target())
            .with_comment(format!("Requirements for target {}", target.name))
            .with_depend(slash_string(&node.output_path));

        let mut writer = RuleWriter::new(&self.converter, &self.settings);
        writer
            .disclaimer()
            .line(&format!("# Rule file for target {}.", target.name))
            .line("")
            .line("# Include any dependencies generated for this rule.")
            .include(&record)
            .line("");
        if !objects.is_empty() {
            writer.line("# Include make rules for object files.");
            for object in objects {
                writer.include(&object.rule_file());
            }
            writer.line("");
        }
        writer.rule(&depends_rule).rule(&link_rule).rule(&requires_rule);

        self.install(&rule_file, &writer.finish(), ctx)
    }

    fn executable_rule(
        &self,
        node: &TargetNode<'_>,
        objects: &[String],
        rule_file: &str,
    ) -> BuildResult<MakeRule> {
        let target = node.target;
        let language = node.linker_language.as_str();
        let defs = &self.dir.definitions;

        let link_var = format!("{}_{}", language, target.kind.link_rule_suffix());
        let template = defs.get_required(&link_var, &target.name)?;

        let (flags, link_flags) = executable_link_flags(defs, target, language);
        let libraries = link_libraries(self.dir, target, self.index, &self.converter);
        let (objects_plain, _) = object_lists(objects, &self.converter);
        let output = self.converter.shell_path(&slash_string(&node.output_path));

        let vars = RuleVariables {
            objects: Some(&objects_plain),
            target: Some(&output),
            link_libraries: Some(&libraries),
            flags: Some(&flags),
            link_flags: Some(&link_flags),
            ..RuleVariables::default()
        };

        let mut depends = objects.to_vec();
        depends.extend(node.link_depends.iter().cloned());
        depends.push(rule_file.to_string());

        Ok(MakeRule::new(slash_string(&node.output_path))
            .with_pre_echo(format!(
                "Linking {} executable {}...",
                language,
                self.converter.relative_output(&slash_string(&node.output_path))
            ))
            .with_depends(depends)
            .with_commands(expand_commands(template, &vars, defs)))
    }

    fn library_rule(
        &self,
        node: &TargetNode<'_>,
        library: &LibraryOutput,
        objects: &[String],
        rule_file: &str,
    ) -> BuildResult<MakeRule> {
        let target = node.target;
        let language = node.linker_language.as_str();
        let defs = &self.dir.definitions;

        let link_var = format!("{}_{}", language, target.kind.link_rule_suffix());
        let template = defs.get_required(&link_var, &target.name)?;

        let render = |path: std::path::PathBuf| self.converter.shell_path(&slash_string(&path));
        let real = render(library.real_path());
        let so = render(library.so_path());
        let link = render(library.link_path());
        let base = render(library.base_path());

        let extra_flags = library_link_flags(defs, target, &node.platform, &self.converter);
        let libraries = link_libraries(self.dir, target, self.index, &self.converter);
        let (objects_plain, objects_quoted) = object_lists(objects, &self.converter);

        let vars = RuleVariables {
            objects: Some(&objects_plain),
            objects_quoted: Some(&objects_quoted),
            target: Some(&real),
            target_base: Some(&base),
            target_soname: Some(&library.names.so_name),
            link_libraries: Some(&libraries),
            link_flags: Some(&extra_flags),
            ..RuleVariables::default()
        };

        let removals: Vec<String> = library
            .names
            .removal_list("")
            .into_iter()
            .map(|name| render(library.dir.join(name)))
            .collect();

        let mut commands = vec![format!("$(MAKEGEN_COMMAND) remove -f {}", removals.join(" "))];
        commands.extend(expand_commands(template, &vars, defs));
        if library.names.needs_symlinks() {
            commands.push(format!("$(MAKEGEN_COMMAND) symlink-library {} {} {}", real, so, link));
        }

        let mut depends = objects.to_vec();
        depends.extend(node.link_depends.iter().cloned());
        depends.push(rule_file.to_string());

        Ok(MakeRule::new(slash_string(&node.output_path))
            .with_pre_echo(format!(
                "Linking {} {} {}...",
                language,
                target.kind,
                self.converter.relative_output(&slash_string(&node.output_path))
            ))
            .with_depends(depends)
            .with_commands(commands))
    }
}
