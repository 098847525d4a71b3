//! Compile and link flag composition
//!
//! Flags are plain strings joined with single spaces; empty contributions are
//! skipped so the result never carries stray separators.

use crate::model::{DirectoryModel, Definitions, TargetIndex};
use crate::naming::Platform;
use crate::paths::{is_full_path, slash_string, PathConverter};
use crate::targets::{SourceFile, TargetKind, TargetUnit};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Append `new_flags` separated by a space, ignoring empty values
pub fn append_flags(flags: &mut String, new_flags: Option<&str>) {
    if let Some(new_flags) = new_flags.filter(|f| !f.is_empty()) {
        if !flags.is_empty() {
            flags.push(' ');
        }
        flags.push_str(new_flags);
    }
}

/// Append a flags variable and its build-type specific variant
pub fn add_config_variable_flags(flags: &mut String, defs: &Definitions, var: &str) {
    append_flags(flags, defs.get(var));
    if let Some(build_type) = defs.build_type() {
        append_flags(flags, defs.get(&format!("{}_{}", var, build_type)));
    }
}

/// Append `<LANG>_FLAGS` and `<LANG>_FLAGS_<BUILD_TYPE>`
pub fn add_language_flags(flags: &mut String, defs: &Definitions, language: &str) {
    add_config_variable_flags(flags, defs, &format!("{}_FLAGS", language));
}

/// Append the flags for code that ends up in shared libraries
pub fn add_shared_flags(flags: &mut String, defs: &Definitions, language: &str, shared: bool) {
    if shared {
        append_flags(
            flags,
            defs.get(&format!("SHARED_LIBRARY_{}_FLAGS", language)),
        );
    }
    if defs.is_on("BUILD_SHARED_LIBS") {
        append_flags(flags, defs.get(&format!("SHARED_BUILD_{}_FLAGS", language)));
    }
}

/// Turn an arbitrary string into a valid C identifier
pub fn make_c_identifier(input: &str) -> String {
    let mut out: String = input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().map_or(false, |c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// The `-D` flag marking objects built into a shared library or module
pub fn export_define(target: &TargetUnit) -> Option<String> {
    if !target.kind.is_shared() {
        return None;
    }
    let symbol = match target.property("DEFINE_SYMBOL") {
        Some(custom) => custom.to_string(),
        None => make_c_identifier(&format!("{}_EXPORTS", target.name)),
    };
    Some(format!("-D{}", symbol))
}

/// Include flags for a language (`INCLUDE_FLAG_<LANG>`, default `-I`)
pub fn include_flags(
    defs: &Definitions,
    language: &str,
    include_dirs: &[PathBuf],
    converter: &PathConverter,
) -> String {
    let flag = defs
        .get_non_empty(&format!("INCLUDE_FLAG_{}", language))
        .unwrap_or("-I");
    include_dirs
        .iter()
        .map(|dir| format!("{}{}", flag, converter.shell_path(&slash_string(dir))))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full flag set for compiling one source of a target
pub fn object_compile_flags(
    dir: &DirectoryModel,
    target: &TargetUnit,
    source: &SourceFile,
    language: &str,
    converter: &PathConverter,
) -> String {
    let defs = &dir.definitions;
    let mut flags = String::new();

    append_flags(&mut flags, export_define(target).as_deref());
    append_flags(&mut flags, source.compile_flags.as_deref());
    add_language_flags(&mut flags, defs, language);
    add_shared_flags(&mut flags, defs, language, target.kind.is_shared());
    let includes = include_flags(defs, language, &dir.include_directories, converter);
    append_flags(&mut flags, Some(&includes));

    flags
}

/// Compiler and linker flags for linking an executable
pub fn executable_link_flags(
    defs: &Definitions,
    target: &TargetUnit,
    language: &str,
) -> (String, String) {
    let mut flags = String::new();
    let mut link_flags = String::new();

    add_config_variable_flags(&mut link_flags, defs, "EXE_LINKER_FLAGS");
    if target.property_is_on("WIN32_EXECUTABLE") {
        append_flags(&mut link_flags, defs.get("CREATE_WIN32_EXE"));
    } else {
        append_flags(&mut link_flags, defs.get("CREATE_CONSOLE_EXE"));
    }

    add_language_flags(&mut flags, defs, language);
    // Any linked library might be shared.
    add_shared_flags(&mut flags, defs, language, true);
    append_flags(&mut link_flags, target.property("LINK_FLAGS"));

    (flags, link_flags)
}

/// Extra linker flags for a library target
pub fn library_link_flags(
    defs: &Definitions,
    target: &TargetUnit,
    platform: &Platform,
    converter: &PathConverter,
) -> String {
    let mut flags = String::new();
    match target.kind {
        TargetKind::StaticLibrary => {
            append_flags(&mut flags, target.property("STATIC_LIBRARY_FLAGS"));
        }
        TargetKind::SharedLibrary => {
            append_flags(&mut flags, target.property("LINK_FLAGS"));
            add_config_variable_flags(&mut flags, defs, "SHARED_LINKER_FLAGS");
            if platform.native_windows {
                let def_flag = defs.get_or("LINK_DEF_FILE_FLAG", "");
                for source in target.sources.iter().filter(|s| s.extension() == "def") {
                    let def_file = converter.shell_path(&source.path_str());
                    append_flags(&mut flags, Some(&format!("{}{}", def_flag, def_file)));
                }
            }
        }
        TargetKind::ModuleLibrary => {
            append_flags(&mut flags, target.property("LINK_FLAGS"));
            add_config_variable_flags(&mut flags, defs, "MODULE_LINKER_FLAGS");
        }
        TargetKind::Executable => {}
    }
    flags
}

/// Render the libraries a target links against
///
/// Library search directories come first, then one entry per library in
/// reference order. The target itself is never linked.
pub fn link_libraries(
    dir: &DirectoryModel,
    target: &TargetUnit,
    index: &TargetIndex,
    converter: &PathConverter,
) -> String {
    let defs = &dir.definitions;
    let path_flag = defs.get_non_empty("LIBRARY_PATH_FLAG").unwrap_or("-L");
    let lib_flag = defs.get_non_empty("LINK_LIBRARY_FLAG").unwrap_or("-l");

    let mut search_dirs: Vec<PathBuf> = dir.link_directories.clone();
    let mut libs = Vec::new();
    let mut emitted = BTreeSet::new();
    emitted.insert(target.name.as_str());

    for lib in &target.link_libraries {
        if !emitted.insert(lib.as_str()) {
            continue;
        }
        if lib.starts_with('-') {
            libs.push(lib.clone());
        } else if is_full_path(lib) {
            libs.push(converter.shell_path(lib));
        } else {
            if let Some(location) = index.lookup(lib).filter(|l| l.kind.is_library()) {
                let lib_dir = dir
                    .library_output_path()
                    .unwrap_or_else(|| location.binary_dir.clone());
                if !search_dirs.contains(&lib_dir) {
                    search_dirs.push(lib_dir);
                }
            }
            libs.push(format!("{}{}", lib_flag, lib));
        }
    }

    search_dirs
        .iter()
        .map(|d| format!("{}{}", path_flag, converter.shell_path(&slash_string(d))))
        .chain(libs)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Space-separated object list and its quoted form
pub fn object_lists(objects: &[String], converter: &PathConverter) -> (String, String) {
    let plain: Vec<String> = objects
        .iter()
        .map(|o| converter.relative_output(o))
        .collect();
    let quoted: Vec<String> = plain.iter().map(|o| format!("\"{}\"", o)).collect();
    (plain.join(" "), quoted.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    #[rstest]
    #[case("my-lib_EXPORTS", "my_lib_EXPORTS")]
    #[case("3d_EXPORTS", "_3d_EXPORTS")]
    #[case("a.b c", "a_b_c")]
    fn test_make_c_identifier(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(make_c_identifier(input), expected);
    }

    #[test]
    fn test_append_flags_skips_empty() {
        let mut flags = String::new();
        append_flags(&mut flags, None);
        append_flags(&mut flags, Some(""));
        append_flags(&mut flags, Some("-O2"));
        append_flags(&mut flags, Some("-g"));
        assert_eq!(flags, "-O2 -g");
    }

    #[test]
    fn test_build_type_variant_appended() {
        let mut defs = Definitions::default();
        defs.set("C_FLAGS", "-Wall");
        defs.set("C_FLAGS_DEBUG", "-g");
        defs.set("BUILD_TYPE", "debug");

        let mut flags = String::new();
        add_language_flags(&mut flags, &defs, "C");
        assert_eq!(flags, "-Wall -g");
    }

    #[test]
    fn test_object_flags_order() {
        let dir = DirectoryModel::new("/src", "/build")
            .with_include_directory("/src/include")
            .with_definition("C_FLAGS", "-Wall")
            .with_definition("SHARED_LIBRARY_C_FLAGS", "-fPIC")
            .with_definition("BUILD_SHARED_LIBS", "ON")
            .with_definition("SHARED_BUILD_C_FLAGS", "-DSHARED");
        let target = TargetUnit::new("mylib", TargetKind::SharedLibrary);
        let source = SourceFile::new("/src/a.c").with_compile_flags("-O0");
        let converter = PathConverter::new("/build", false);

        assert_eq!(
            object_compile_flags(&dir, &target, &source, "C", &converter),
            "-Dmylib_EXPORTS -O0 -Wall -fPIC -DSHARED -I/src/include"
        );
    }

    #[test]
    fn test_custom_define_symbol() {
        let target = TargetUnit::new("plug", TargetKind::ModuleLibrary)
            .with_property("DEFINE_SYMBOL", "BUILDING_PLUG");
        assert_eq!(export_define(&target).as_deref(), Some("-DBUILDING_PLUG"));
        assert_eq!(
            export_define(&TargetUnit::new("s", TargetKind::StaticLibrary)),
            None
        );
    }

    #[test]
    fn test_executable_flags() {
        let mut defs = Definitions::default();
        defs.set("EXE_LINKER_FLAGS", "-rdynamic");
        defs.set("CREATE_CONSOLE_EXE", "-console");
        defs.set("CREATE_WIN32_EXE", "-mwindows");
        defs.set("SHARED_LIBRARY_C_FLAGS", "-fPIC");
        let target = TargetUnit::new("app", TargetKind::Executable).with_property("LINK_FLAGS", "-pie");

        let (flags, link_flags) = executable_link_flags(&defs, &target, "C");
        assert_eq!(flags, "-fPIC");
        assert_eq!(link_flags, "-rdynamic -console -pie");

        let gui = target.with_property("WIN32_EXECUTABLE", "TRUE");
        assert_eq!(executable_link_flags(&defs, &gui, "C").1, "-rdynamic -mwindows -pie");
    }

    #[test]
    fn test_def_file_flag_on_native_windows() {
        let mut defs = Definitions::default();
        defs.set("LINK_DEF_FILE_FLAG", "/DEF:");
        let target = TargetUnit::new("dll", TargetKind::SharedLibrary)
            .with_source(SourceFile::new("/src/a.c"))
            .with_source(SourceFile::new("/src/exports.def"));
        let converter = PathConverter::new("/build", true);

        let windows = Platform {
            native_windows: true,
            ..Platform::default()
        };
        assert_eq!(
            library_link_flags(&defs, &target, &windows, &converter),
            "/DEF:/src/exports.def"
        );
        assert_eq!(
            library_link_flags(&defs, &target, &Platform::default(), &converter),
            ""
        );
    }

    #[test]
    fn test_link_libraries_rendering() {
        let dir = DirectoryModel::new("/src/app", "/build/app");
        let mut index = TargetIndex::new();
        index.insert("foo", Path::new("/build/lib"), TargetKind::SharedLibrary);
        index.insert("app", Path::new("/build/app"), TargetKind::Executable);

        let target = TargetUnit::new("app", TargetKind::Executable)
            .with_link_library("foo")
            .with_link_library("-pthread")
            .with_link_library("/opt/lib/libz.a")
            .with_link_library("m")
            .with_link_library("foo")
            .with_link_library("app");
        let converter = PathConverter::new("/build/app", false);

        assert_eq!(
            link_libraries(&dir, &target, &index, &converter),
            "-L/build/lib -lfoo -pthread /opt/lib/libz.a -lm"
        );
    }

    #[test]
    fn test_object_lists() {
        let converter = PathConverter::new("/build", false);
        let (plain, quoted) =
            object_lists(&["t.dir/a.o".to_string(), "t.dir/b.o".to_string()], &converter);
        assert_eq!(plain, "t.dir/a.o t.dir/b.o");
        assert_eq!(quoted, "\"t.dir/a.o\" \"t.dir/b.o\"");
    }
}
