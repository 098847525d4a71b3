//! Placeholder expansion in command templates
//!
//! Command templates come from definitions such as `C_COMPILE_OBJECT` and
//! hold `;`-separated commands with `<NAME>` placeholders.

use crate::model::{expand_list, Definitions};
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<([A-Za-z_][A-Za-z0-9_]*)>").expect("placeholder pattern is valid")
    })
}

/// Values available to one command template
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleVariables<'a> {
    pub objects: Option<&'a str>,
    pub objects_quoted: Option<&'a str>,
    pub target: Option<&'a str>,
    pub target_base: Option<&'a str>,
    pub target_soname: Option<&'a str>,
    pub link_libraries: Option<&'a str>,
    pub source: Option<&'a str>,
    pub object: Option<&'a str>,
    pub flags: Option<&'a str>,
    pub link_flags: Option<&'a str>,
}

impl<'a> RuleVariables<'a> {
    fn lookup(&self, name: &str) -> Option<Option<&'a str>> {
        let value = match name {
            "OBJECTS" => self.objects,
            "OBJECTS_QUOTED" => self.objects_quoted,
            "TARGET" => self.target,
            "TARGET_BASE" => self.target_base,
            "TARGET_SONAME" => self.target_soname,
            "LINK_LIBRARIES" => self.link_libraries,
            "SOURCE" => self.source,
            "OBJECT" => self.object,
            "FLAGS" => self.flags,
            "LINK_FLAGS" => self.link_flags,
            _ => return None,
        };
        Some(value)
    }
}

/// Expand the placeholders of one command
///
/// Rule placeholders take the values given for this rule and stay verbatim
/// when the rule has none. Any other placeholder naming a definition expands
/// to its value; unknown placeholders are kept as written.
pub fn expand_rule_variables(template: &str, vars: &RuleVariables<'_>, defs: &Definitions) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            match vars.lookup(name) {
                Some(Some(value)) => value.to_string(),
                Some(None) => caps[0].to_string(),
                None => defs
                    .get(name)
                    .map(str::to_string)
                    .unwrap_or_else(|| caps[0].to_string()),
            }
        })
        .into_owned()
}

/// Split a `;`-separated template list and expand every command
pub fn expand_commands(template: &str, vars: &RuleVariables<'_>, defs: &Definitions) -> Vec<String> {
    expand_list(template)
        .iter()
        .map(|command| expand_rule_variables(command, vars, defs))
        .collect()
}
