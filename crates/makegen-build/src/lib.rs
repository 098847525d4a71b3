//! makegen rule generation and dependency tracking
//!
//! Turns a project model into Unix makefiles:
//! - Decomposition of targets into per-object and per-target build units
//! - Transitive `#include` scanning with persisted dependency records
//! - Integrity checks that invalidate artifacts whose dependees vanished
//! - Jump-and-build rules for libraries built in other directories
//! - Platform library naming and symlink chains
//!
//! Generated files are only replaced when their content changes, so a
//! second pass over an unchanged project leaves every timestamp alone.

pub mod check;
pub mod context;
pub mod depends;
pub mod error;
pub mod flags;
pub mod generator;
pub mod graph;
pub mod install;
pub mod language;
pub mod model;
pub mod naming;
pub mod paths;
pub mod remote;
pub mod rules;
pub mod targets;
pub mod variables;

// Re-export main types
pub use check::{check_build_system, BuildSystemCheck, BuildSystemStatus, CHECK_FILE_NAME};
pub use context::{GenerationContext, GenerationReport, UnitFailure};
pub use depends::{
    scan_all, CheckOutcome, DependencyIntegrityChecker, DependencyRecord, DependencyScanner,
    ScanRequest,
};
pub use error::{BuildError, BuildResult};
pub use generator::{generate_project, LocalGenerator};
pub use graph::{LibraryOutput, TargetGraph, TargetGraphBuilder, TargetNode};
pub use install::{install_if_different, InstallOutcome};
pub use model::{Definitions, DirectoryModel, ProjectModel, TargetIndex};
pub use naming::{create_symlink_chain, LibraryNames, Platform};
pub use remote::{CrossDirectoryCoordinator, JumpStrategy, RemoteTargetRef};
pub use rules::{MakeRule, MakeSettings, RuleWriter, MAKEFILE_NAME};
pub use targets::{ObjectUnit, SourceFile, TargetKind, TargetUnit};
