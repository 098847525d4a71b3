//! Cross-directory link dependencies
//!
//! A target linking a library built in another directory cannot build it
//! directly. The coordinator records a [`RemoteTargetRef`] for it, and the
//! directory makefile gets a jump-and-build rule that runs make in the
//! library's binary directory.

use crate::context::GenerationContext;
use crate::model::{Definitions, DirectoryModel, TargetIndex};
use crate::naming::Platform;
use crate::paths::{is_full_path, slash_string, PathConverter};
use crate::rules::{MakeRule, MakeSettings};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A project target built in another directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTargetRef {
    /// Target name
    pub name: String,
    /// Binary directory owning the target
    pub binary_dir: PathBuf,
    /// Output file the local rules depend on
    pub file_path: PathBuf,
}

/// How a jump-and-build rule changes directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpStrategy {
    /// One `&&`-chained line; the shell starts in the makefile directory on every line
    Chained,
    /// Separate lines with an explicit `cd` back; the shell keeps its directory
    Sequential,
}

impl JumpStrategy {
    /// Select the strategy for a pass from the shell the makefiles run in
    pub fn from_definitions(defs: &Definitions) -> Self {
        if defs.is_on("WINDOWS_SHELL") {
            Self::Sequential
        } else {
            Self::Chained
        }
    }
}

/// Resolves link-library references into dependency edges
pub struct CrossDirectoryCoordinator<'a> {
    index: &'a TargetIndex,
}

impl<'a> CrossDirectoryCoordinator<'a> {
    pub fn new(index: &'a TargetIndex) -> Self {
        Self { index }
    }

    /// Dependency edge for one link-library reference, if it has one
    ///
    /// Linker flags and unknown library names have no edge. Project
    /// libraries depend on their output file; those built elsewhere are also
    /// registered for a jump-and-build rule. An unknown reference that is an
    /// existing absolute path depends on that file.
    pub fn resolve(
        &self,
        reference: &str,
        dir: &DirectoryModel,
        ctx: &mut GenerationContext,
    ) -> Option<String> {
        if reference.starts_with('-') {
            return None;
        }

        if let Some(location) = self.index.lookup(reference).filter(|l| l.kind.is_library()) {
            let platform = Platform::from_definitions(&dir.definitions);
            let (prefix, suffix) = platform.affixes(location.kind);
            let link_name = format!("{}{}{}", prefix, reference, suffix);

            if location.binary_dir == dir.binary_dir {
                let path = dir.library_output_dir().join(link_name);
                return Some(slash_string(&path));
            }

            let lib_dir = dir
                .library_output_path()
                .unwrap_or_else(|| location.binary_dir.clone());
            let remote = ctx.remote_target(reference, &location.binary_dir, &lib_dir.join(link_name));
            debug!(target = reference, dir = %remote.binary_dir.display(), "remote link dependency");
            return Some(slash_string(&remote.file_path));
        }

        if is_full_path(reference) && Path::new(reference).exists() {
            return Some(reference.to_string());
        }
        None
    }
}

/// Jump-and-build rules for every remote target registered in the pass
pub fn jump_and_build_rules(
    ctx: &GenerationContext,
    current_binary_dir: &Path,
    settings: &MakeSettings,
    converter: &PathConverter,
) -> Vec<MakeRule> {
    ctx.remote_targets
        .values()
        .map(|remote| {
            let depends_target = format!("{0}.dir/{0}.depends", remote.name);
            let requires_target = format!("{}.requires", remote.name);
            let destination = converter.output_for_existing(&remote.binary_dir);

            let commands = match ctx.strategy {
                JumpStrategy::Chained => vec![format!(
                    "cd {} && {} && {} && {}",
                    destination,
                    settings.recursive_make_call("check_build_system"),
                    settings.recursive_make_call(&depends_target),
                    settings.recursive_make_call(&requires_target)
                )],
                JumpStrategy::Sequential => vec![
                    format!("cd {}", destination),
                    settings.recursive_make_call("check_build_system"),
                    settings.recursive_make_call(&depends_target),
                    settings.recursive_make_call(&requires_target),
                    format!("cd {}", converter.output_for_existing(current_binary_dir)),
                ],
            };

            MakeRule::new(slash_string(&remote.file_path))
                .with_pre_echo(format!(
                    "Jumping to {} to build {}...",
                    slash_string(&remote.binary_dir),
                    remote.name
                ))
                .with_post_echo(format!(
                    "Returning to {}...",
                    slash_string(current_binary_dir)
                ))
                .with_commands(commands)
        })
        .collect()
}
