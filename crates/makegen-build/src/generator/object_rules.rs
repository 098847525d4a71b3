use super::LocalGenerator;
use crate::context::GenerationContext;
use crate::depends::DependencyIntegrityChecker;
use crate::error::{BuildError, BuildResult};
use crate::flags::object_compile_flags;
use crate::graph::TargetNode;
use crate::paths::slash_string;
use crate::rules::{MakeRule, RuleWriter};
use crate::targets::ObjectUnit;
use crate::variables::{expand_commands, RuleVariables};

impl LocalGenerator<'_> {
    /// Write `<object>.make`: the scan rule and the compile rule of one object
    pub(super) fn write_object_rule_file(
        &self,
        node: &TargetNode<'_>,
        object: &ObjectUnit,
        ctx: &mut GenerationContext,
    ) -> BuildResult<()> {
        let binary_dir = &self.dir.binary_dir;
        if let Some(parent) = object.parent_dir() {
            let dir = binary_dir.join(parent);
            std::fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;
        }

        let unit = object.object_path.as_str();
        let language = object.language.as_str();
        let compile_var = format!("{}_COMPILE_OBJECT", language);
        let compile_template = self.dir.definitions.get_required(&compile_var, unit)?;

        let record = DependencyIntegrityChecker::ensure_record(binary_dir, unit)?;
        let rule_file = object.rule_file();

        let mut depends = vec![object.source.path_str()];
        depends.extend(object.source.object_depends.iter().map(|d| slash_string(d)));
        depends.push(rule_file.clone());

        let source = self.converter.shell_path(&object.source.path_str());
        let object_arg = self.converter.shell_path(unit);

        // The scanner names the source in the record, so it always gets the full path.
        let scan_source = self.converter.output_for_existing(&object.source.full_path);
        let mut scan = format!(
            "$(MAKEGEN_COMMAND) depends {} {} {}",
            language, object_arg, scan_source
        );
        for dir in &self.dir.include_directories {
            scan.push_str(" -I");
            scan.push_str(&self.converter.shell_path(&slash_string(dir)));
        }
        let scan_rule = MakeRule::new(object.mark_file())
            .with_pre_echo(format!("Scanning {} dependencies of {}...", language, unit))
            .with_depends(depends.clone())
            .with_commands(vec![scan]);

        let flags = object_compile_flags(self.dir, node.target, &object.source, language, &self.converter);
        let vars = RuleVariables {
            source: Some(&source),
            object: Some(&object_arg),
            flags: Some(&flags),
            ..RuleVariables::default()
        };
        let build_rule = MakeRule::new(unit)
            .with_pre_echo(format!("Building {} object {}...", language, unit))
            .with_depends(depends)
            .with_commands(expand_commands(compile_template, &vars, &self.dir.definitions));

        let mut writer = RuleWriter::new(&self.converter, &self.settings);
        writer
            .disclaimer()
            .line(&format!("# Rule file for object file {}.", unit))
            .line("")
            .line("# Include any dependencies generated for this rule.")
            .include(&record)
            .line("")
            .rule(&scan_rule)
            .rule(&build_rule);

        self.install(&rule_file, &writer.finish(), ctx)
    }
}
