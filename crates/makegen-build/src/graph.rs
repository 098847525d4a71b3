//! Decomposition of targets into object and link units
//!
//! The graph is built once per directory pass. Units that cannot be built
//! are reported in the context and left out; everything else still gets
//! rules.

use crate::context::GenerationContext;
use crate::error::BuildError;
use crate::language::{linker_language, output_extension, LanguageTable};
use crate::model::{DirectoryModel, TargetIndex};
use crate::naming::{LibraryNames, Platform};
use crate::remote::CrossDirectoryCoordinator;
use crate::targets::{ObjectUnit, SourceFile, TargetUnit};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output files of a library target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryOutput {
    pub dir: PathBuf,
    pub names: LibraryNames,
}

impl LibraryOutput {
    pub fn real_path(&self) -> PathBuf {
        self.dir.join(&self.names.real_name)
    }

    pub fn so_path(&self) -> PathBuf {
        self.dir.join(&self.names.so_name)
    }

    pub fn link_path(&self) -> PathBuf {
        self.dir.join(&self.names.link_name)
    }

    pub fn base_path(&self) -> PathBuf {
        self.dir.join(&self.names.base_name)
    }
}

/// One target ready for rule generation
#[derive(Debug, Clone)]
pub struct TargetNode<'a> {
    pub target: &'a TargetUnit,
    pub objects: Vec<ObjectUnit>,
    pub linker_language: String,
    pub platform: Platform,
    /// File other rules depend on: the executable or the library link name
    pub output_path: PathBuf,
    /// Set for library targets
    pub library: Option<LibraryOutput>,
    /// Files of linked libraries the target must be relinked after
    pub link_depends: Vec<String>,
}

/// Targets of one directory and its aggregate targets
#[derive(Debug, Clone, Default)]
pub struct TargetGraph<'a> {
    pub nodes: Vec<TargetNode<'a>>,
    /// Prerequisites of `all.depends`
    pub all_depends: Vec<String>,
    /// Prerequisites of `all.build`
    pub all_build: Vec<String>,
}

/// Builds the [`TargetGraph`] of a directory
pub struct TargetGraphBuilder<'a> {
    coordinator: CrossDirectoryCoordinator<'a>,
}

impl<'a> TargetGraphBuilder<'a> {
    pub fn new(index: &'a TargetIndex) -> Self {
        Self {
            coordinator: CrossDirectoryCoordinator::new(index),
        }
    }

    /// Build the graph for every target of `dir`, in name order
    pub fn build<'d>(&self, dir: &'d DirectoryModel, ctx: &mut GenerationContext) -> TargetGraph<'d> {
        let languages = LanguageTable::from_definitions(&dir.definitions);
        let mut graph = TargetGraph::default();

        let mut targets: Vec<&TargetUnit> = dir.targets.iter().collect();
        targets.sort_by(|a, b| a.name.cmp(&b.name));

        for target in targets {
            if target.in_all {
                graph.all_depends.push(target.depends_mark());
                graph.all_build.push(target.requires_target());
            }
            if let Some(node) = self.build_target(dir, target, &languages, ctx) {
                graph.nodes.push(node);
            }
        }

        debug!(
            dir = %dir.binary_dir.display(),
            targets = graph.nodes.len(),
            objects = graph.nodes.iter().map(|n| n.objects.len()).sum::<usize>(),
            "built target graph"
        );
        graph
    }

    fn build_target<'d>(
        &self,
        dir: &'d DirectoryModel,
        target: &'d TargetUnit,
        languages: &LanguageTable,
        ctx: &mut GenerationContext,
    ) -> Option<TargetNode<'d>> {
        let objects = object_units(dir, target, languages, ctx);

        let object_languages: Vec<&str> = objects.iter().map(|o| o.language.as_str()).collect();
        let Some(language) = linker_language(target.property("LINKER_LANGUAGE"), &object_languages)
        else {
            ctx.report.record_failure(
                &target.name,
                BuildError::configuration(&target.name, "cannot determine linker language"),
            );
            return None;
        };

        let defs = &dir.definitions;
        let platform = Platform::from_definitions(defs).with_linker_language(defs, &language);

        let (output_path, library) = if target.kind.is_library() {
            let names = LibraryNames::compute(
                &target.name,
                target.kind,
                &platform,
                target.property("VERSION"),
                target.property("SOVERSION"),
            );
            let library = LibraryOutput {
                dir: dir.library_output_dir(),
                names,
            };
            (library.link_path(), Some(library))
        } else {
            (executable_path(dir, target, &platform), None)
        };

        let mut seen = BTreeSet::new();
        seen.insert(target.name.as_str());
        let mut link_depends = Vec::new();
        for lib in &target.link_libraries {
            if !seen.insert(lib.as_str()) {
                continue;
            }
            if let Some(edge) = self.coordinator.resolve(lib, dir, ctx) {
                if !link_depends.contains(&edge) {
                    link_depends.push(edge);
                }
            }
        }

        Some(TargetNode {
            target,
            objects,
            linker_language: language,
            platform,
            output_path,
            library,
            link_depends,
        })
    }
}

fn executable_path(dir: &DirectoryModel, target: &TargetUnit, platform: &Platform) -> PathBuf {
    let mut path = dir.executable_output_dir();
    if platform.apple && target.property_is_on("MACOSX_BUNDLE") {
        path = path
            .join(format!("{}.app", target.name))
            .join("Contents")
            .join("MacOS");
    }
    path.join(format!("{}{}", target.name, platform.executable_suffix))
}

fn object_units(
    dir: &DirectoryModel,
    target: &TargetUnit,
    languages: &LanguageTable,
    ctx: &mut GenerationContext,
) -> Vec<ObjectUnit> {
    let mut objects = Vec::new();
    let mut used = BTreeSet::new();

    for source in &target.sources {
        if source.header_only || source.has_custom_command || languages.is_ignored(source.extension()) {
            continue;
        }
        let Some(language) = languages.language_of(source.extension()) else {
            ctx.report
                .record_failure(source.path_str(), BuildError::unknown_language(&source.full_path));
            continue;
        };

        let extension = output_extension(&dir.definitions, language);
        let name = unique_object_name(&object_stem(dir, source), extension, &mut used);
        let object_path = format!("{}/{}", target.directory(), name);
        ctx.register_check_depend(object_path.clone());

        objects.push(ObjectUnit {
            target: target.name.clone(),
            source: source.clone(),
            language: language.to_string(),
            object_path,
        });
    }
    objects
}

/// Object name of a source without its extension
///
/// Sources inside the source or binary directory keep their relative path;
/// anything else is reduced to its file name.
fn object_stem(dir: &DirectoryModel, source: &SourceFile) -> String {
    let path = &source.full_path;
    let relative = [&dir.source_dir, &dir.binary_dir]
        .iter()
        .find_map(|base| path.strip_prefix(base).ok())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(path.file_name().unwrap_or_default()));

    let stem = relative.with_extension("");
    crate::paths::slash_string(&stem)
        .replace("../", "__/")
        .replace([' ', ':'], "_")
}

fn unique_object_name(stem: &str, extension: &str, used: &mut BTreeSet<String>) -> String {
    let name = format!("{}{}", stem, extension);
    if used.insert(name.clone()) {
        return name;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}_{}{}", stem, n, extension);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::JumpStrategy;
    use crate::targets::TargetKind;
    use pretty_assertions::assert_eq;

    fn context() -> GenerationContext {
        GenerationContext::new(JumpStrategy::Chained)
    }

    fn objects_of<'a>(graph: &'a TargetGraph<'_>, name: &str) -> Vec<&'a str> {
        graph
            .nodes
            .iter()
            .find(|n| n.target.name == name)
            .map(|n| n.objects.iter().map(|o| o.object_path.as_str()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_mylib_objects_and_names() {
        let dir = DirectoryModel::new("/src", "/build").with_target(
            TargetUnit::new("mylib", TargetKind::StaticLibrary)
                .with_source(SourceFile::new("/src/a.c"))
                .with_source(SourceFile::new("/src/b.c")),
        );
        let index = TargetIndex::from_directories(std::slice::from_ref(&dir));
        let mut ctx = context();

        let graph = TargetGraphBuilder::new(&index).build(&dir, &mut ctx);

        assert_eq!(objects_of(&graph, "mylib"), vec!["mylib.dir/a.o", "mylib.dir/b.o"]);
        let node = &graph.nodes[0];
        assert_eq!(node.linker_language, "C");
        assert_eq!(node.output_path, PathBuf::from("/build/libmylib.a"));
        assert_eq!(graph.all_depends, vec!["mylib.dir/mylib.depends"]);
        assert_eq!(graph.all_build, vec!["mylib.requires"]);
        assert!(ctx.check_depends.contains("mylib.dir/a.o"));
        assert!(ctx.report.is_success());
    }

    #[test]
    fn test_colliding_sources_get_suffixes() {
        let dir = DirectoryModel::new("/src", "/build").with_target(
            TargetUnit::new("t", TargetKind::Executable)
                .with_source(SourceFile::new("/outside/one/a.c"))
                .with_source(SourceFile::new("/outside/two/a.c"))
                .with_source(SourceFile::new("/outside/three/a.c"))
                .with_source(SourceFile::new("/src/sub/a.c")),
        );
        let index = TargetIndex::from_directories(std::slice::from_ref(&dir));

        let graph = TargetGraphBuilder::new(&index).build(&dir, &mut context());

        assert_eq!(
            objects_of(&graph, "t"),
            vec!["t.dir/a.o", "t.dir/a_1.o", "t.dir/a_2.o", "t.dir/sub/a.o"]
        );
    }

    #[test]
    fn test_skipped_sources() {
        let dir = DirectoryModel::new("/src", "/build").with_target(
            TargetUnit::new("t", TargetKind::Executable)
                .with_source(SourceFile::new("/src/main.cpp"))
                .with_source(SourceFile::new("/src/api.h"))
                .with_source(SourceFile::new("/src/gen.c").with_custom_command(true))
                .with_source(SourceFile::new("/src/inline.c").with_header_only(true))
                .with_source(SourceFile::new("/src/prog.f90")),
        );
        let index = TargetIndex::from_directories(std::slice::from_ref(&dir));
        let mut ctx = context();

        let graph = TargetGraphBuilder::new(&index).build(&dir, &mut ctx);

        assert_eq!(objects_of(&graph, "t"), vec!["t.dir/main.o"]);
        assert_eq!(graph.nodes[0].linker_language, "CXX");
        assert_eq!(ctx.report.failures.len(), 1);
        assert!(ctx.report.failures[0].error.is_configuration());
    }

    #[test]
    fn test_target_without_objects_is_reported() {
        let dir = DirectoryModel::new("/src", "/build")
            .with_target(TargetUnit::new("empty", TargetKind::Executable))
            .with_target(
                TargetUnit::new("ok", TargetKind::Executable).with_source(SourceFile::new("/src/m.c")),
            );
        let index = TargetIndex::from_directories(std::slice::from_ref(&dir));
        let mut ctx = context();

        let graph = TargetGraphBuilder::new(&index).build(&dir, &mut ctx);

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.all_build, vec!["empty.requires", "ok.requires"]);
        assert_eq!(ctx.report.failures[0].unit, "empty");
    }

    #[test]
    fn test_versioned_shared_library_output() {
        let dir = DirectoryModel::new("/src", "/build")
            .with_definition("SHARED_LIBRARY_SONAME_C_FLAG", "-Wl,-soname,")
            .with_definition("LIBRARY_OUTPUT_PATH", "lib")
            .with_target(
                TargetUnit::new("foo", TargetKind::SharedLibrary)
                    .with_source(SourceFile::new("/src/foo.c"))
                    .with_property("VERSION", "1.2.3")
                    .with_property("SOVERSION", "1"),
            );
        let index = TargetIndex::from_directories(std::slice::from_ref(&dir));

        let graph = TargetGraphBuilder::new(&index).build(&dir, &mut context());
        let node = &graph.nodes[0];
        let library = node.library.as_ref().unwrap();

        assert_eq!(node.output_path, PathBuf::from("/build/lib/libfoo.so"));
        assert_eq!(library.real_path(), PathBuf::from("/build/lib/libfoo.so.1.2.3"));
        assert_eq!(library.so_path(), PathBuf::from("/build/lib/libfoo.so.1"));
    }

    #[test]
    fn test_bundle_executable_path() {
        let dir = DirectoryModel::new("/src", "/build")
            .with_definition("APPLE", "1")
            .with_target(
                TargetUnit::new("viewer", TargetKind::Executable)
                    .with_source(SourceFile::new("/src/v.c"))
                    .with_property("MACOSX_BUNDLE", "ON"),
            );
        let index = TargetIndex::from_directories(std::slice::from_ref(&dir));

        let graph = TargetGraphBuilder::new(&index).build(&dir, &mut context());

        assert_eq!(
            graph.nodes[0].output_path,
            PathBuf::from("/build/viewer.app/Contents/MacOS/viewer")
        );
    }

    #[test]
    fn test_link_depends_deduplicated_and_exclude_self() {
        let dir = DirectoryModel::new("/src", "/build")
            .with_target(TargetUnit::new("util", TargetKind::StaticLibrary).with_source(SourceFile::new("/src/u.c")))
            .with_target(
                TargetUnit::new("app", TargetKind::Executable)
                    .with_source(SourceFile::new("/src/main.c"))
                    .with_link_library("util")
                    .with_link_library("-lm")
                    .with_link_library("app")
                    .with_link_library("util"),
            );
        let index = TargetIndex::from_directories(std::slice::from_ref(&dir));

        let graph = TargetGraphBuilder::new(&index).build(&dir, &mut context());
        let app = graph.nodes.iter().find(|n| n.target.name == "app").unwrap();

        assert_eq!(app.link_depends, vec!["/build/libutil.a"]);
    }

    #[test]
    fn test_not_in_all_excluded_from_aggregates() {
        let dir = DirectoryModel::new("/src", "/build").with_target(
            TargetUnit::new("extra", TargetKind::Executable)
                .with_source(SourceFile::new("/src/x.c"))
                .with_in_all(false),
        );
        let index = TargetIndex::from_directories(std::slice::from_ref(&dir));

        let graph = TargetGraphBuilder::new(&index).build(&dir, &mut context());

        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.all_depends.is_empty());
        assert!(graph.all_build.is_empty());
    }
}
