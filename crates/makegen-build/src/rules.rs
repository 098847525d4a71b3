//! Makefile rule rendering
//!
//! Every generated file is assembled in memory by a [`RuleWriter`] and then
//! installed atomically by the caller.

use crate::model::Definitions;
use crate::paths::PathConverter;

/// Name of the generated makefile in every binary directory
pub const MAKEFILE_NAME: &str = "Makefile.makegen";

/// A single make rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MakeRule {
    pub comment: Option<String>,
    pub pre_echo: Option<String>,
    pub post_echo: Option<String>,
    pub target: String,
    pub depends: Vec<String>,
    pub commands: Vec<String>,
}

impl MakeRule {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_pre_echo(mut self, echo: impl Into<String>) -> Self {
        self.pre_echo = Some(echo.into());
        self
    }

    pub fn with_post_echo(mut self, echo: impl Into<String>) -> Self {
        self.post_echo = Some(echo.into());
        self
    }

    pub fn with_depends(mut self, depends: Vec<String>) -> Self {
        self.depends = depends;
        self
    }

    pub fn with_depend(mut self, depend: impl Into<String>) -> Self {
        self.depends.push(depend.into());
        self
    }

    pub fn with_commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }
}

/// Settings of the make tool the rules are written for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeSettings {
    /// Flag passed to recursive makes to keep them quiet
    pub silent_flag: String,
    /// Pass `-$(MAKEFLAGS)` explicitly to recursive makes
    pub pass_makeflags: bool,
    /// The shell keeps its working directory between command lines
    pub windows_shell: bool,
    /// Directive used to include other makefiles
    pub include_directive: String,
}

impl Default for MakeSettings {
    fn default() -> Self {
        Self {
            silent_flag: "-s".to_string(),
            pass_makeflags: false,
            windows_shell: false,
            include_directive: "include".to_string(),
        }
    }
}

impl MakeSettings {
    pub fn from_definitions(defs: &Definitions) -> Self {
        let d = Self::default();
        Self {
            silent_flag: defs.get_or("MAKE_SILENT_FLAG", &d.silent_flag).to_string(),
            pass_makeflags: defs.is_on("MAKE_PASS_FLAGS"),
            windows_shell: defs.is_on("WINDOWS_SHELL"),
            include_directive: defs
                .get_non_empty("MAKE_INCLUDE_DIRECTIVE")
                .unwrap_or(&d.include_directive)
                .to_string(),
        }
    }

    /// Command that runs make on the generated makefile for one target
    pub fn recursive_make_call(&self, target: &str) -> String {
        let mut cmd = format!("$(MAKE) -f {} ", MAKEFILE_NAME);
        if !self.silent_flag.is_empty() {
            cmd.push_str(&self.silent_flag);
            cmd.push(' ');
        }
        // Some makes do not forward flags through the environment.
        if self.pass_makeflags {
            cmd.push_str("-$(MAKEFLAGS) ");
        }
        cmd.push_str(target);
        cmd
    }
}

/// Text buffer for one generated makefile
pub struct RuleWriter<'a> {
    out: String,
    converter: &'a PathConverter,
    settings: &'a MakeSettings,
}

impl<'a> RuleWriter<'a> {
    pub fn new(converter: &'a PathConverter, settings: &'a MakeSettings) -> Self {
        Self {
            out: String::new(),
            converter,
            settings,
        }
    }

    /// Write the do-not-edit header
    pub fn disclaimer(&mut self) -> &mut Self {
        self.out.push_str("# makegen generated file: DO NOT EDIT!\n");
        self.out.push_str(&format!(
            "# Generated by \"Unix Makefiles\" generator, makegen version {}\n\n",
            env!("CARGO_PKG_VERSION")
        ));
        self
    }

    /// Write a section divider
    pub fn divider(&mut self) -> &mut Self {
        self.out.push('#');
        self.out.push_str(&"=".repeat(77));
        self.out.push('\n');
        self
    }

    /// Write comment lines followed by a blank line
    pub fn comments(&mut self, lines: &[&str]) -> &mut Self {
        for line in lines {
            self.out.push_str("# ");
            self.out.push_str(line);
            self.out.push('\n');
        }
        self.out.push('\n');
        self
    }

    /// Write a raw line
    pub fn line(&mut self, text: &str) -> &mut Self {
        self.out.push_str(text);
        self.out.push('\n');
        self
    }

    /// Write an include directive for another makefile
    pub fn include(&mut self, path: &str) -> &mut Self {
        let path = self.converter.shell_path(path);
        self.out
            .push_str(&format!("{} {}\n", self.settings.include_directive, path));
        self
    }

    /// Write one rule
    pub fn rule(&mut self, rule: &MakeRule) -> &mut Self {
        if let Some(comment) = &rule.comment {
            for line in comment.split('\n') {
                self.out.push_str("# ");
                self.out.push_str(line);
                self.out.push('\n');
            }
        }

        let target = self.converter.make_target(&rule.target);
        // A one-letter target followed by ':' reads as a drive letter on Windows.
        let space = if target.chars().count() == 1 { " " } else { "" };

        if rule.depends.is_empty() {
            self.out.push_str(&format!("{}{}:\n", target, space));
        } else {
            for dep in &rule.depends {
                let dep = self.converter.make_target(dep);
                self.out.push_str(&format!("{}{}: {}\n", target, space, dep));
            }
        }

        for (i, command) in rule.commands.iter().enumerate() {
            if i == 0 {
                if let Some(echo) = &rule.pre_echo {
                    self.echo(echo);
                }
            }
            self.out.push('\t');
            self.out.push_str(command);
            self.out.push('\n');
        }
        if let Some(echo) = &rule.post_echo {
            self.echo(echo);
        }
        self.out.push('\n');
        self
    }

    fn echo(&mut self, text: &str) {
        if self.settings.windows_shell {
            self.out.push_str(&format!("\t@echo {}\n", text));
        } else {
            self.out
                .push_str(&format!("\t@echo \"{}\"\n", text.replace('"', "\\\"")));
        }
    }

    /// Finish and return the text
    pub fn finish(self) -> String {
        self.out
    }
}
