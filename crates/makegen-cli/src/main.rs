use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Unix makefile generator for C and C++ projects.
///
/// makegen reads a makegen.toml project manifest and writes a tree of
/// makefiles into a build directory. The generated makefiles call back into
/// makegen to scan include dependencies, validate dependency records and
/// regenerate themselves when the manifest changes.
///
/// EXAMPLES:
///     makegen generate -S . -B build         Generate makefiles into build/
///     makegen generate -D BUILD_TYPE=Debug   Override a definition
///     makegen cache -B build                 List cached definitions
///
/// ENVIRONMENT VARIABLES:
///     MAKEGEN_BUILD_TYPE  Override the BUILD_TYPE definition
///     MAKEGEN_VERBOSE     Set to '1' to generate verbose makefiles
///     RUST_LOG            Log filter (overrides -v)
#[derive(Parser)]
#[command(name = "makegen")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate makefiles for a project
    ///
    /// Loads the manifest found in (or above) the source directory, merges
    /// the definition cache and -D overrides, saves the cache and writes one
    /// makefile per project directory under the build directory.
    ///
    /// EXAMPLES:
    ///     makegen generate -S . -B build
    ///     makegen generate -B build -D C_FLAGS=-O2 -D BUILD_TYPE=Release
    #[command(visible_alias = "g")]
    Generate {
        /// Source directory holding makegen.toml
        #[arg(short = 'S', default_value = ".")]
        source: PathBuf,
        /// Build directory to generate into
        #[arg(short = 'B', default_value = ".")]
        build: PathBuf,
        /// Definition override (KEY=VALUE), saved to the cache
        #[arg(short = 'D', value_name = "KEY=VALUE")]
        define: Vec<String>,
    },

    /// Scan the include dependencies of one object file
    ///
    /// Run by the generated makefiles from the build directory. Writes the
    /// object's dependency record and mark file.
    Depends {
        /// Source language (C or CXX)
        language: String,
        /// Object file, relative to the current directory
        object: String,
        /// Source file
        source: PathBuf,
        /// Include search directory
        #[arg(short = 'I', value_name = "DIR")]
        include: Vec<PathBuf>,
    },

    /// Validate dependency records and reset the stale ones
    CheckDepends {
        /// Artifacts whose records are checked, relative to --dir
        #[arg(required = true)]
        artifacts: Vec<String>,
        /// Directory the artifacts are named relative to
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Regenerate the build system if its inputs changed
    ///
    /// Run by the check_build_system target of every generated makefile.
    CheckBuildSystem {
        /// Top-level source directory
        #[arg(short = 'S', default_value = ".")]
        source: PathBuf,
        /// Top-level build directory
        #[arg(short = 'B', default_value = ".")]
        build: PathBuf,
        /// Check file written next to the makefile
        check_file: PathBuf,
    },

    /// Remove files
    Remove {
        /// Ignore files that do not exist
        #[arg(short = 'f')]
        force: bool,
        /// Files to remove
        files: Vec<PathBuf>,
    },

    /// Create the symlinks of a versioned library
    SymlinkLibrary {
        /// Library file with the full version
        real: PathBuf,
        /// Soname link
        so: PathBuf,
        /// Unversioned link name
        link: PathBuf,
    },

    /// List the cached definitions of a build directory
    Cache {
        /// Build directory
        #[arg(short = 'B', default_value = ".")]
        build: PathBuf,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     makegen completions bash > ~/.local/share/bash-completion/completions/makegen
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate {
            source,
            build,
            define,
        } => {
            let args = commands::generate::GenerateArgs {
                source,
                build,
                defines: define,
            };
            commands::generate::run(args)?;
        }
        Commands::Depends {
            language,
            object,
            source,
            include,
        } => {
            let args = commands::depends::DependsArgs {
                directory: std::env::current_dir()?,
                language,
                object,
                source,
                include_path: include,
            };
            commands::depends::run(args)?;
        }
        Commands::CheckDepends { artifacts, dir } => {
            commands::depends::check(&dir, &artifacts)?;
        }
        Commands::CheckBuildSystem {
            source,
            build,
            check_file,
        } => {
            commands::check::run(commands::check::CheckArgs {
                source,
                build,
                check_file,
            })?;
        }
        Commands::Remove { force, files } => {
            commands::files::remove(&files, force)?;
        }
        Commands::SymlinkLibrary { real, so, link } => {
            commands::files::symlink_library(&real, &so, &link)?;
        }
        Commands::Cache { build } => {
            commands::cache::run(&build)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_attached_dir_flags() {
        let cli = Cli::parse_from(["makegen", "generate", "-S/src", "-B/build", "-DC_FLAGS=-O2"]);
        match cli.command {
            Commands::Generate {
                source,
                build,
                define,
            } => {
                assert_eq!(source, PathBuf::from("/src"));
                assert_eq!(build, PathBuf::from("/build"));
                assert_eq!(define, vec!["C_FLAGS=-O2"]);
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_depends_include_flags() {
        let cli = Cli::parse_from([
            "makegen", "depends", "C", "t.dir/a.o", "/src/a.c", "-I/src", "-I/inc",
        ]);
        match cli.command {
            Commands::Depends {
                language, include, ..
            } => {
                assert_eq!(language, "C");
                assert_eq!(include, vec![PathBuf::from("/src"), PathBuf::from("/inc")]);
            }
            _ => panic!("Expected Depends command"),
        }
    }

    #[test]
    fn test_remove_force_flag() {
        let cli = Cli::parse_from(["makegen", "remove", "-f", "a", "b"]);
        match cli.command {
            Commands::Remove { force, files } => {
                assert!(force);
                assert_eq!(files.len(), 2);
            }
            _ => panic!("Expected Remove command"),
        }
    }

    #[test]
    fn test_verbose_is_counted() {
        let cli = Cli::parse_from(["makegen", "-vv", "cache"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_alias_g_for_generate() {
        let cli = Cli::parse_from(["makegen", "g"]);
        assert!(matches!(cli.command, Commands::Generate { .. }));
    }
}
