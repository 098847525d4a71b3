//! CLI integration tests
//!
//! Runs the `makegen` binary against small projects in temporary
//! directories, the way generated makefiles invoke it.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const MYLIB: &str = r#"
[project]
name = "mylib"

[definitions]
C_COMPILE_OBJECT = "cc <FLAGS> -o <OBJECT> -c <SOURCE>"
C_CREATE_STATIC_LIBRARY = "ar cr <TARGET> <OBJECTS>;ranlib <TARGET>"

[[directory]]
include_directories = ["."]

[[directory.target]]
name = "mylib"
kind = "static-library"
sources = ["a.c", "b.c"]
"#;

fn makegen_cmd() -> Command {
    let mut cmd = Command::cargo_bin("makegen").unwrap();
    cmd.env_remove("MAKEGEN_BUILD_TYPE")
        .env_remove("MAKEGEN_VERBOSE")
        .env_remove("RUST_LOG");
    cmd
}

/// A source tree with the `mylib` manifest and an empty build directory
fn mylib_tree() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    let build = temp.path().join("build");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("makegen.toml"), MYLIB).unwrap();
    fs::write(src.join("a.c"), "#include \"a.h\"\n").unwrap();
    fs::write(src.join("a.h"), "#define A 1\n").unwrap();
    fs::write(src.join("b.c"), "int b;\n").unwrap();
    (temp, src, build)
}

fn generate(src: &Path, build: &Path) -> assert_cmd::assert::Assert {
    makegen_cmd()
        .arg("generate")
        .arg("-S")
        .arg(src)
        .arg("-B")
        .arg(build)
        .assert()
}

mod generate_command {
    use super::*;

    #[test]
    fn test_generate_writes_build_tree() {
        let (_temp, src, build) = mylib_tree();

        generate(&src, &build)
            .success()
            .stdout(predicate::str::contains("Build files have been written to"));

        let makefile = fs::read_to_string(build.join("Makefile.makegen")).unwrap();
        assert!(makefile.contains("all.build: mylib.requires"));
        assert!(makefile.contains("MAKEGEN_COMMAND = "));
        assert!(build.join("mylib.dir/mylib.make").exists());
        assert!(build.join("mylib.dir/a.o.make").exists());
        assert!(build.join("Makefile.makegen.check").exists());
        assert!(build.join("MakegenCache.toml").exists());
    }

    #[test]
    fn test_second_generate_leaves_files_unchanged() {
        let (_temp, src, build) = mylib_tree();
        generate(&src, &build).success();

        generate(&src, &build)
            .success()
            .stdout(predicate::str::contains("(0 files written"));
    }

    #[test]
    fn test_defines_are_cached() {
        let (_temp, src, build) = mylib_tree();

        makegen_cmd()
            .arg("generate")
            .arg("-S")
            .arg(&src)
            .arg("-B")
            .arg(&build)
            .arg("-DC_FLAGS=-O2")
            .assert()
            .success();

        let rules = fs::read_to_string(build.join("mylib.dir/a.o.make")).unwrap();
        assert!(rules.contains("\tcc -O2 -I"));

        makegen_cmd()
            .arg("cache")
            .arg("-B")
            .arg(&build)
            .assert()
            .success()
            .stdout(predicate::str::contains("C_FLAGS=-O2"));
    }

    #[test]
    fn test_bad_define_fails() {
        let (_temp, src, build) = mylib_tree();

        makegen_cmd()
            .arg("generate")
            .arg("-S")
            .arg(&src)
            .arg("-B")
            .arg(&build)
            .arg("-DNOVALUE")
            .assert()
            .failure()
            .stderr(predicate::str::contains("expected KEY=VALUE"));
    }

    #[test]
    fn test_missing_manifest_fails() {
        let temp = TempDir::new().unwrap();

        generate(temp.path(), &temp.path().join("build"))
            .failure()
            .stderr(predicate::str::contains("Failed to load project"));
    }

    #[test]
    fn test_unit_failure_exits_non_zero() {
        let (_temp, src, build) = mylib_tree();
        fs::write(
            src.join("makegen.toml"),
            MYLIB.replace("C_COMPILE_OBJECT = \"cc <FLAGS> -o <OBJECT> -c <SOURCE>\"\n", ""),
        )
        .unwrap();

        generate(&src, &build)
            .failure()
            .stderr(predicate::str::contains("C_COMPILE_OBJECT"));
        assert!(build.join("Makefile.makegen").exists());
    }
}

mod check_commands {
    use super::*;

    fn check_build_system(src: &Path, build: &Path) -> assert_cmd::assert::Assert {
        makegen_cmd()
            .current_dir(build)
            .arg("check-build-system")
            .arg("-S")
            .arg(src)
            .arg("-B")
            .arg(build)
            .arg("Makefile.makegen.check")
            .assert()
    }

    #[test]
    fn test_up_to_date_build_system_is_left_alone() {
        let (_temp, src, build) = mylib_tree();
        generate(&src, &build).success();

        check_build_system(&src, &build)
            .success()
            .stdout(predicate::str::contains("Re-running").not());
    }

    #[test]
    fn test_changed_manifest_regenerates() {
        let (_temp, src, build) = mylib_tree();
        generate(&src, &build).success();

        let later = SystemTime::now() + Duration::from_secs(30);
        fs::File::options()
            .write(true)
            .open(src.join("makegen.toml"))
            .unwrap()
            .set_modified(later)
            .unwrap();

        check_build_system(&src, &build)
            .success()
            .stdout(predicate::str::contains("Re-running makegen..."));
    }

    #[test]
    fn test_missing_check_file_regenerates() {
        let (_temp, src, build) = mylib_tree();
        generate(&src, &build).success();
        fs::remove_file(build.join("Makefile.makegen.check")).unwrap();

        check_build_system(&src, &build)
            .success()
            .stdout(predicate::str::contains("Re-running makegen..."));
        assert!(build.join("Makefile.makegen.check").exists());
    }

    #[test]
    fn test_depends_writes_record() {
        let (_temp, src, build) = mylib_tree();
        generate(&src, &build).success();

        makegen_cmd()
            .current_dir(&build)
            .args(["depends", "C", "mylib.dir/a.o"])
            .arg(src.join("a.c"))
            .arg(format!("-I{}", src.display()))
            .assert()
            .success();

        let record = fs::read_to_string(build.join("mylib.dir/a.o.depends.make")).unwrap();
        assert!(record.contains(&format!("mylib.dir/a.o: {}", src.join("a.h").display())));
        assert!(build.join("mylib.dir/a.o.depends").exists());
    }

    #[test]
    fn test_depends_resolves_relative_source_against_build_dir() {
        let (_temp, src, build) = mylib_tree();
        generate(&src, &build).success();
        fs::write(build.join("gen.c"), "#include \"a.h\"\n").unwrap();

        makegen_cmd()
            .current_dir(&build)
            .args(["depends", "C", "mylib.dir/gen.o", "gen.c"])
            .arg(format!("-I{}", src.display()))
            .assert()
            .success();

        let record = fs::read_to_string(build.join("mylib.dir/gen.o.depends.make")).unwrap();
        assert!(record.contains(&format!("mylib.dir/gen.o: {}", src.join("a.h").display())));
        assert!(record.contains(&format!("mylib.dir/gen.o: {}", build.join("gen.c").display())));
    }

    #[test]
    fn test_depends_rejects_unscannable_language() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("x.f"), "end\n").unwrap();

        makegen_cmd()
            .current_dir(temp.path())
            .args(["depends", "Fortran", "x.o", "x.f"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Fortran"));
    }

    #[test]
    fn test_check_depends_resets_stale_record() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(dir.join("a.o"), "object").unwrap();
        fs::write(
            dir.join("a.o.depends.make"),
            format!("a.o: {}\n", dir.join("gone.h").display()),
        )
        .unwrap();

        makegen_cmd()
            .arg("check-depends")
            .arg("--dir")
            .arg(dir)
            .arg("a.o")
            .assert()
            .success()
            .stdout(predicate::str::contains("Dependencies of a.o changed"));

        assert!(!dir.join("a.o").exists());
        assert!(fs::read_to_string(dir.join("a.o.depends.make"))
            .unwrap()
            .starts_with("# Empty dependencies file for a.o."));
    }
}

mod file_commands {
    use super::*;

    #[test]
    fn test_remove_force_ignores_missing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("libfoo.so"), "").unwrap();

        makegen_cmd()
            .current_dir(temp.path())
            .args(["remove", "-f", "libfoo.so", "libfoo.so.1"])
            .assert()
            .success();
        assert!(!temp.path().join("libfoo.so").exists());
    }

    #[test]
    fn test_remove_without_force_reports_missing() {
        let temp = TempDir::new().unwrap();

        makegen_cmd()
            .current_dir(temp.path())
            .args(["remove", "nothing.o"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot remove nothing.o"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_library_chain() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("libfoo.so.1.2.3"), "elf").unwrap();

        makegen_cmd()
            .current_dir(temp.path())
            .args(["symlink-library", "libfoo.so.1.2.3", "libfoo.so.1", "libfoo.so"])
            .assert()
            .success();

        assert_eq!(
            fs::read_link(temp.path().join("libfoo.so.1")).unwrap(),
            Path::new("libfoo.so.1.2.3")
        );
        assert_eq!(
            fs::read_link(temp.path().join("libfoo.so")).unwrap(),
            Path::new("libfoo.so.1")
        );
    }
}

mod help_messages {
    use super::*;

    #[test]
    fn test_main_help_lists_commands() {
        makegen_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("generate"))
            .stdout(predicate::str::contains("check-build-system"))
            .stdout(predicate::str::contains("symlink-library"))
            .stdout(predicate::str::contains("MAKEGEN_BUILD_TYPE"));
    }

    #[test]
    fn test_completions_bash() {
        makegen_cmd()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("makegen"));
    }
}
