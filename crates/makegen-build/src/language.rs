//! Source language identification
//!
//! Maps file extensions to languages. The defaults cover C and C++; a
//! directory can extend or replace them with `<LANG>_SOURCE_FILE_EXTENSIONS`
//! for each language listed in `LANGUAGES`.

use crate::model::{expand_list, Definitions};
use std::collections::{BTreeMap, BTreeSet};

const DEFAULT_LANGUAGES: &[(&str, &[&str])] = &[
    ("C", &["c", "m"]),
    ("CXX", &["C", "M", "c++", "cc", "cpp", "cxx", "mm"]),
];

const DEFAULT_IGNORED: &str = "h;H;hh;hpp;hxx;inl;o;O;obj;OBJ;def;DEF;rc;RC";

/// Extension to language lookup for one directory
#[derive(Debug, Clone)]
pub struct LanguageTable {
    by_extension: BTreeMap<String, String>,
    ignored: BTreeSet<String>,
    order: Vec<String>,
}

impl LanguageTable {
    /// Table with only the built-in languages
    pub fn builtin() -> Self {
        let mut table = Self {
            by_extension: BTreeMap::new(),
            ignored: expand_list(DEFAULT_IGNORED).into_iter().collect(),
            order: Vec::new(),
        };
        for (lang, exts) in DEFAULT_LANGUAGES {
            table.add_language(lang, exts.iter().map(|e| e.to_string()));
        }
        table
    }

    /// Table for a directory's definitions
    pub fn from_definitions(defs: &Definitions) -> Self {
        let mut table = Self::builtin();

        for lang in defs.list("LANGUAGES") {
            let key = format!("{}_SOURCE_FILE_EXTENSIONS", lang);
            let exts = defs.list(&key);
            table.add_language(&lang, exts.into_iter());
        }

        if let Some(ignored) = defs.get("IGNORE_EXTENSIONS") {
            table.ignored = expand_list(ignored).into_iter().collect();
        }

        table
    }

    fn add_language(&mut self, lang: &str, extensions: impl Iterator<Item = String>) {
        if !self.order.iter().any(|l| l == lang) {
            self.order.push(lang.to_string());
        }
        for ext in extensions {
            self.by_extension.insert(ext, lang.to_string());
        }
    }

    /// Language of a source extension (without the dot)
    pub fn language_of(&self, extension: &str) -> Option<&str> {
        self.by_extension.get(extension).map(String::as_str)
    }

    /// Whether files with this extension never produce objects
    pub fn is_ignored(&self, extension: &str) -> bool {
        self.ignored.contains(extension)
    }

    /// Known languages in registration order
    pub fn languages(&self) -> &[String] {
        &self.order
    }
}

/// Object file extension for a language (`<LANG>_OUTPUT_EXTENSION`, default `.o`)
pub fn output_extension<'a>(defs: &'a Definitions, language: &str) -> &'a str {
    defs.get_non_empty(&format!("{}_OUTPUT_EXTENSION", language))
        .unwrap_or(".o")
}

/// Choose the language used to link a target
///
/// An explicit `LINKER_LANGUAGE` wins; otherwise C++ wins over C, and any
/// other mix falls back to the first language seen.
pub fn linker_language(explicit: Option<&str>, object_languages: &[&str]) -> Option<String> {
    if let Some(lang) = explicit {
        return Some(lang.to_string());
    }
    if object_languages.iter().any(|l| *l == "CXX") {
        return Some("CXX".to_string());
    }
    if object_languages.iter().any(|l| *l == "C") {
        return Some("C".to_string());
    }
    object_languages.first().map(|l| l.to_string())
}
