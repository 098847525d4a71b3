//! Transitive `#include` scanner for C and C++ sources
//!
//! The scan is a breadth-first walk over a work queue, so include depth
//! never grows the stack. Headers that cannot be found on the include path
//! are dropped without error: they may be generated later, and the next scan
//! picks them up.

use super::record::DependencyRecord;
use crate::error::{BuildError, BuildResult};
use crate::paths::collapse_full_path;
use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

fn include_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^[ \t]*#[ \t]*include[ \t]*[<"]([^">]+)[">]"#)
            .expect("include pattern is valid")
    })
}

/// Whether dependencies of a language can be scanned
pub fn is_scannable(language: &str) -> bool {
    matches!(language, "C" | "CXX")
}

/// Include scanner for one include search path
#[derive(Debug, Clone)]
pub struct DependencyScanner {
    include_path: Vec<PathBuf>,
}

impl DependencyScanner {
    pub fn new(include_path: Vec<PathBuf>) -> Self {
        Self { include_path }
    }

    /// Create a scanner for a language, rejecting languages that cannot be scanned
    pub fn for_language(language: &str, include_path: Vec<PathBuf>) -> BuildResult<Self> {
        if !is_scannable(language) {
            return Err(BuildError::UnsupportedScanLanguage(language.to_string()));
        }
        Ok(Self::new(include_path))
    }

    /// Scan `source` and every header it reaches
    pub fn scan(&self, object: &str, source: &Path) -> DependencyRecord {
        let mut record = DependencyRecord::new(object);

        let start = source.to_string_lossy().into_owned();
        let mut encountered: BTreeSet<String> = BTreeSet::new();
        let mut scanned: BTreeSet<PathBuf> = BTreeSet::new();
        let mut unscanned: VecDeque<String> = VecDeque::new();
        encountered.insert(start.clone());
        unscanned.push_back(start);

        while let Some(name) = unscanned.pop_front() {
            let Some(full_path) = self.resolve(&name) else {
                debug!(include = %name, "include not found on search path");
                continue;
            };
            if !scanned.insert(full_path.clone()) {
                continue;
            }

            let bytes = match std::fs::read(&full_path) {
                Ok(bytes) => bytes,
                Err(_) => continue,
            };
            record.insert(full_path);

            let text = String::from_utf8_lossy(&bytes);
            for line in text.lines() {
                if let Some(caps) = include_regex().captures(line) {
                    let include = caps[1].to_string();
                    if encountered.insert(include.clone()) {
                        unscanned.push_back(include);
                    }
                }
            }
        }

        record
    }

    /// Resolve an include spelling to a file path
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            return Some(collapse_full_path(path, Path::new("/")));
        }
        self.include_path
            .iter()
            .map(|dir| collapse_full_path(path, dir))
            .find(|candidate| candidate.exists())
    }

    /// Scan and persist the record for one object
    pub fn scan_and_write(&self, directory: &Path, object: &str, source: &Path) -> BuildResult<DependencyRecord> {
        let record = self.scan(object, source);
        record.write(directory)?;
        debug!(object, dependees = record.len(), "scanned dependencies");
        Ok(record)
    }
}

/// One object to scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub language: String,
    pub object: String,
    pub source: PathBuf,
}

/// Scan a batch of objects in parallel
///
/// Each request reads its own sources and writes its own record, so the
/// scans need no coordination. Results come back in request order.
pub fn scan_all(
    directory: &Path,
    requests: &[ScanRequest],
    include_path: &[PathBuf],
) -> Vec<(String, BuildResult<DependencyRecord>)> {
    requests
        .par_iter()
        .map(|request| {
            let result = DependencyScanner::for_language(&request.language, include_path.to_vec())
                .and_then(|scanner| scanner.scan_and_write(directory, &request.object, &request.source));
            if let Err(e) = &result {
                warn!(object = %request.object, error = %e, "dependency scan failed");
            }
            (request.object.clone(), result)
        })
        .collect()
}
