//! Library file naming
//!
//! A versioned shared library lives on disk under its real name and is
//! reached through a chain of symlinks: real name <- soname <- link name.
//! Names that coincide are never removed twice or linked to themselves.

use crate::error::{BuildError, BuildResult};
use crate::model::Definitions;
use crate::targets::TargetKind;
use std::path::Path;

/// Platform naming conventions for one linker language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub static_prefix: String,
    pub static_suffix: String,
    pub shared_prefix: String,
    pub shared_suffix: String,
    pub module_prefix: String,
    pub module_suffix: String,
    pub executable_suffix: String,
    /// The linker supports an soname flag, so versions are honored
    pub has_soname: bool,
    /// Executables may be placed inside application bundles
    pub apple: bool,
    /// Native Windows toolchain (not Cygwin or MinGW)
    pub native_windows: bool,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            static_prefix: "lib".to_string(),
            static_suffix: ".a".to_string(),
            shared_prefix: "lib".to_string(),
            shared_suffix: ".so".to_string(),
            module_prefix: "lib".to_string(),
            module_suffix: ".so".to_string(),
            executable_suffix: String::new(),
            has_soname: false,
            apple: false,
            native_windows: false,
        }
    }
}

impl Platform {
    /// Read the conventions from a directory's definitions
    pub fn from_definitions(defs: &Definitions) -> Self {
        let d = Self::default();
        let pick = |name: &str, fallback: &str| defs.get_or(name, fallback).to_string();

        Self {
            static_prefix: pick("STATIC_LIBRARY_PREFIX", &d.static_prefix),
            static_suffix: pick("STATIC_LIBRARY_SUFFIX", &d.static_suffix),
            shared_prefix: pick("SHARED_LIBRARY_PREFIX", &d.shared_prefix),
            shared_suffix: pick("SHARED_LIBRARY_SUFFIX", &d.shared_suffix),
            module_prefix: pick("SHARED_MODULE_PREFIX", &d.module_prefix),
            module_suffix: pick("SHARED_MODULE_SUFFIX", &d.module_suffix),
            executable_suffix: pick("EXECUTABLE_SUFFIX", &d.executable_suffix),
            has_soname: false,
            apple: defs.is_on("APPLE"),
            native_windows: defs.is_on("WIN32") && !(defs.is_on("CYGWIN") || defs.is_on("MINGW")),
        }
    }

    /// Honor library versions when the linker language has an soname flag
    pub fn with_linker_language(mut self, defs: &Definitions, language: &str) -> Self {
        self.has_soname = defs
            .get_non_empty(&format!("SHARED_LIBRARY_SONAME_{}_FLAG", language))
            .is_some();
        self
    }

    /// Prefix and suffix for a target kind
    pub fn affixes(&self, kind: TargetKind) -> (&str, &str) {
        match kind {
            TargetKind::StaticLibrary => (&self.static_prefix, &self.static_suffix),
            TargetKind::SharedLibrary => (&self.shared_prefix, &self.shared_suffix),
            TargetKind::ModuleLibrary => (&self.module_prefix, &self.module_suffix),
            TargetKind::Executable => ("", &self.executable_suffix),
        }
    }
}

/// The four file names of a library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryNames {
    /// Name other rules depend on and link against
    pub link_name: String,
    /// Versioned soname, or the real name when there is none
    pub so_name: String,
    /// Fully versioned on-disk file
    pub real_name: String,
    /// Prefix and name without suffix or version
    pub base_name: String,
}

impl LibraryNames {
    /// Compute the names for a library target
    pub fn compute(
        name: &str,
        kind: TargetKind,
        platform: &Platform,
        version: Option<&str>,
        soversion: Option<&str>,
    ) -> Self {
        let (prefix, suffix) = platform.affixes(kind);

        let (version, soversion) = if kind.is_shared() && platform.has_soname {
            // A version without an soversion doubles as the soversion.
            (version, soversion.or(version))
        } else {
            (None, None)
        };

        let link_name = format!("{}{}{}", prefix, name, suffix);

        let so_name = match soversion {
            Some(so) => format!("{}.{}", link_name, so),
            None => link_name.clone(),
        };

        let real_name = match (version, soversion) {
            (Some(v), _) => format!("{}.{}", link_name, v),
            (None, Some(so)) => format!("{}.{}", link_name, so),
            (None, None) => link_name.clone(),
        };

        Self {
            link_name,
            so_name,
            real_name,
            base_name: format!("{}{}", prefix, name),
        }
    }

    /// Distinct names to remove before relinking, real name first
    pub fn removal_list(&self, dir_prefix: &str) -> Vec<String> {
        let mut names = vec![format!("{}{}", dir_prefix, self.real_name)];
        if self.so_name != self.real_name {
            names.push(format!("{}{}", dir_prefix, self.so_name));
        }
        if self.link_name != self.so_name && self.link_name != self.real_name {
            names.push(format!("{}{}", dir_prefix, self.link_name));
        }
        names
    }

    /// Whether a symlink chain is needed after linking
    pub fn needs_symlinks(&self) -> bool {
        self.link_name != self.real_name
    }
}

/// Create the symlink chain `real <- so <- link`, skipping names equal to their target
pub fn create_symlink_chain(real: &Path, so: &Path, link: &Path) -> BuildResult<()> {
    if so != real {
        replace_with_symlink(file_name(real)?, so)?;
    }
    if link != so {
        replace_with_symlink(file_name(so)?, link)?;
    }
    Ok(())
}

fn file_name(path: &Path) -> BuildResult<&Path> {
    path.file_name().map(Path::new).ok_or_else(|| {
        BuildError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })
}

fn replace_with_symlink(target: &Path, link: &Path) -> BuildResult<()> {
    if std::fs::symlink_metadata(link).is_ok() {
        std::fs::remove_file(link).map_err(|e| BuildError::io(link, e))?;
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).map_err(|e| BuildError::io(link, e))
    }

    #[cfg(not(unix))]
    {
        let source = link.parent().unwrap_or(Path::new(".")).join(target);
        std::fs::copy(&source, link)
            .map(|_| ())
            .map_err(|e| BuildError::io(link, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soname_platform() -> Platform {
        Platform {
            has_soname: true,
            ..Platform::default()
        }
    }

    #[test]
    fn test_three_distinct_names() {
        let names = LibraryNames::compute(
            "foo",
            TargetKind::SharedLibrary,
            &soname_platform(),
            Some("1.2.3"),
            Some("1"),
        );

        assert_eq!(names.link_name, "libfoo.so");
        assert_eq!(names.so_name, "libfoo.so.1");
        assert_eq!(names.real_name, "libfoo.so.1.2.3");
        assert_eq!(names.base_name, "libfoo");
        assert_eq!(
            names.removal_list(""),
            vec!["libfoo.so.1.2.3", "libfoo.so.1", "libfoo.so"]
        );
        assert!(names.needs_symlinks());
    }

    #[test]
    fn test_version_doubles_as_soversion() {
        let names = LibraryNames::compute(
            "foo",
            TargetKind::SharedLibrary,
            &soname_platform(),
            Some("2"),
            None,
        );

        assert_eq!(names.so_name, "libfoo.so.2");
        assert_eq!(names.real_name, "libfoo.so.2");
        assert_eq!(names.removal_list("out/"), vec!["out/libfoo.so.2", "out/libfoo.so"]);
    }

    #[test]
    fn test_versions_ignored_without_soname_flag() {
        let names = LibraryNames::compute(
            "foo",
            TargetKind::SharedLibrary,
            &Platform::default(),
            Some("1.2"),
            Some("1"),
        );

        assert_eq!(names.real_name, "libfoo.so");
        assert_eq!(names.removal_list(""), vec!["libfoo.so"]);
        assert!(!names.needs_symlinks());
    }

    #[test]
    fn test_static_library_never_versioned() {
        let names = LibraryNames::compute(
            "util",
            TargetKind::StaticLibrary,
            &soname_platform(),
            Some("3"),
            None,
        );

        assert_eq!(names.link_name, "libutil.a");
        assert_eq!(names.real_name, "libutil.a");
    }

    #[test]
    fn test_platform_from_definitions() {
        let mut defs = Definitions::default();
        defs.set("SHARED_LIBRARY_PREFIX", "");
        defs.set("SHARED_LIBRARY_SUFFIX", ".dll");
        defs.set("SHARED_LIBRARY_SONAME_C_FLAG", "-Wl,-soname,");
        defs.set("WIN32", "1");
        defs.set("MINGW", "1");

        let platform = Platform::from_definitions(&defs);
        assert_eq!(platform.affixes(TargetKind::SharedLibrary), ("", ".dll"));
        assert!(!platform.has_soname);
        assert!(!platform.native_windows);
        assert!(platform.clone().with_linker_language(&defs, "C").has_soname);
        assert!(!platform.with_linker_language(&defs, "CXX").has_soname);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_chain_links_each_name_once() {
        let temp = tempfile::TempDir::new().unwrap();
        let real = temp.path().join("libfoo.so.1.2.3");
        let so = temp.path().join("libfoo.so.1");
        let link = temp.path().join("libfoo.so");
        std::fs::write(&real, "elf").unwrap();
        std::fs::write(&link, "stale").unwrap();

        create_symlink_chain(&real, &so, &link).unwrap();

        assert_eq!(std::fs::read_link(&so).unwrap(), Path::new("libfoo.so.1.2.3"));
        assert_eq!(std::fs::read_link(&link).unwrap(), Path::new("libfoo.so.1"));
        assert_eq!(std::fs::read_to_string(&link).unwrap(), "elf");
        assert!(std::fs::symlink_metadata(&real).unwrap().file_type().is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_chain_skips_equal_names() {
        let temp = tempfile::TempDir::new().unwrap();
        let real = temp.path().join("libfoo.so.2");
        let link = temp.path().join("libfoo.so");
        std::fs::write(&real, "elf").unwrap();

        create_symlink_chain(&real, &real, &link).unwrap();

        assert!(std::fs::symlink_metadata(&real).unwrap().file_type().is_file());
        assert_eq!(std::fs::read_link(&link).unwrap(), Path::new("libfoo.so.2"));
    }
}
