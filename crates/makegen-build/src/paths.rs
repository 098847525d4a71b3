//! Path helpers shared by the generator, scanner and checker

use std::path::{Component, Path, PathBuf};

/// Whether a path string names an absolute location
pub fn is_full_path(path: &str) -> bool {
    let p = Path::new(path);
    if p.is_absolute() {
        return true;
    }
    // Drive-letter paths written with forward slashes count as full on every host.
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

/// Make `path` absolute against `base` and normalize `.` and `..` lexically
pub fn collapse_full_path(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Render a path with forward slashes
pub fn slash_string(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '\\' {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}

/// Converts paths into the forms used inside generated makefiles
#[derive(Debug, Clone)]
pub struct PathConverter {
    binary_dir: PathBuf,
    windows_shell: bool,
}

impl PathConverter {
    pub fn new(binary_dir: impl Into<PathBuf>, windows_shell: bool) -> Self {
        Self {
            binary_dir: binary_dir.into(),
            windows_shell,
        }
    }

    /// The directory generated makefiles run in
    pub fn binary_dir(&self) -> &Path {
        &self.binary_dir
    }

    /// Full path of a file named relative to the binary directory
    pub fn full_path(&self, local: &str) -> PathBuf {
        collapse_full_path(Path::new(local), &self.binary_dir)
    }

    /// Render a path relative to the binary directory when it lies inside it
    pub fn relative_output(&self, path: &str) -> String {
        if !is_full_path(path) {
            return path.to_string();
        }
        let full = collapse_full_path(Path::new(path), &self.binary_dir);
        if full.starts_with(&self.binary_dir) {
            if let Some(rel) = pathdiff::diff_paths(&full, &self.binary_dir) {
                let rel = slash_string(&rel);
                return if rel.is_empty() { ".".to_string() } else { rel };
            }
        }
        slash_string(&full)
    }

    /// Render a path as a make target or prerequisite
    pub fn make_target(&self, path: &str) -> String {
        let rel = self.relative_output(path);
        let rel = rel.strip_prefix("./").unwrap_or(&rel);
        rel.replace(' ', "\\ ")
    }

    /// Render a path as a shell argument
    pub fn shell_path(&self, path: &str) -> String {
        let rel = self.relative_output(path);
        self.quote(&rel)
    }

    /// Render an existing full path as a shell argument
    pub fn output_for_existing(&self, path: &Path) -> String {
        self.quote(&slash_string(path))
    }

    fn quote(&self, s: &str) -> String {
        if s.contains(' ') && !s.starts_with('"') {
            format!("\"{}\"", s)
        } else {
            s.to_string()
        }
    }

    /// Whether commands run in a shell that keeps its directory between lines
    pub fn windows_shell(&self) -> bool {
        self.windows_shell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/a/b/../c", "/a/c")]
    #[case("/a/./b/", "/a/b")]
    #[case("x/y", "/base/x/y")]
    #[case("../z", "/z")]
    fn test_collapse_full_path(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(
            collapse_full_path(Path::new(input), Path::new("/base")),
            PathBuf::from(expected)
        );
    }

    #[test]
    fn test_is_full_path() {
        assert!(is_full_path("/usr/include"));
        assert!(is_full_path("C:/include"));
        assert!(!is_full_path("include"));
        assert!(!is_full_path("-lm"));
    }

    #[test]
    fn test_relative_output() {
        let conv = PathConverter::new("/build/lib", false);
        assert_eq!(conv.relative_output("/build/lib/foo.dir/a.o"), "foo.dir/a.o");
        assert_eq!(conv.relative_output("/build/lib"), ".");
        assert_eq!(conv.relative_output("/build/app/app"), "/build/app/app");
        assert_eq!(conv.relative_output("foo.dir/a.o"), "foo.dir/a.o");
    }

    #[test]
    fn test_make_target_escapes_spaces() {
        let conv = PathConverter::new("/build", false);
        assert_eq!(conv.make_target("/src/my dir/a.c"), "/src/my\\ dir/a.c");
        assert_eq!(conv.make_target("./all"), "all");
    }

    #[test]
    fn test_shell_path_quotes_spaces() {
        let conv = PathConverter::new("/build", false);
        assert_eq!(conv.shell_path("/src/my dir/a.c"), "\"/src/my dir/a.c\"");
        assert_eq!(conv.shell_path("/src/a.c"), "/src/a.c");
    }
}
