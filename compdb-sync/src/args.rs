// SPDX-License-Identifier: GPL-3.0-or-later

//! This module contains the command line interface of the application.
//!
//! The command line parsing is implemented using the `clap` library.
//! The module is defining types to represent a structured form of the
//! program invocation. The `Arguments` type is used to represent all
//! possible invocations of the program.

use anyhow::anyhow;
use clap::{arg, command, ArgAction, ArgMatches, Command};
use std::fmt;

/// Common constants used in the module.
const MODE_DIAGNOSTICS_SUBCOMMAND: &str = "diagnostics";
const MODE_MERGE_SUBCOMMAND: &str = "merge";
const STDIN_MARKER: &str = "-";

/// Represents the command line arguments of the application.
#[derive(Debug, PartialEq)]
pub struct Arguments {
    // The path of the configuration file.
    pub config: Option<String>,
    // The verbosity level, the number of `-v` flags.
    pub verbose: u8,
    // The mode of the application.
    pub mode: Mode,
}

/// Represents the mode of the application.
#[derive(Debug, PartialEq)]
pub enum Mode {
    /// Extract the problem list from a captured compiler error stream.
    Diagnostics {
        input: ErrorStream,
        directory: String,
        project: String,
        policy: PolicyOverrides,
    },
    /// Merge the build output into the consolidated compilation database.
    Merge {
        build_dir: String,
        project: String,
        output: Option<String>,
    },
}

/// Where the captured error stream is read from.
#[derive(Debug, PartialEq)]
pub enum ErrorStream {
    Stdin,
    File(String),
}

/// Command line overrides of the diagnostic visibility configuration.
#[derive(Debug, Default, PartialEq)]
pub struct PolicyOverrides {
    pub allow_outside: bool,
    pub keep_outside_warnings: bool,
}

impl TryFrom<ArgMatches> for Arguments {
    type Error = anyhow::Error;

    fn try_from(matches: ArgMatches) -> Result<Self, Self::Error> {
        let config = matches.get_one::<String>("config").map(String::to_string);
        let verbose = matches.get_count("verbose");

        let mode = match matches.subcommand() {
            Some((MODE_DIAGNOSTICS_SUBCOMMAND, diagnostics_matches)) => {
                let input = match required(diagnostics_matches, "input")? {
                    value if value == STDIN_MARKER => ErrorStream::Stdin,
                    value => ErrorStream::File(value),
                };
                Mode::Diagnostics {
                    input,
                    directory: required(diagnostics_matches, "directory")?,
                    project: required(diagnostics_matches, "project")?,
                    policy: PolicyOverrides {
                        allow_outside: diagnostics_matches.get_flag("allow-outside"),
                        keep_outside_warnings: diagnostics_matches.get_flag("keep-outside-warnings"),
                    },
                }
            }
            Some((MODE_MERGE_SUBCOMMAND, merge_matches)) => Mode::Merge {
                build_dir: required(merge_matches, "build-dir")?,
                project: required(merge_matches, "project")?,
                output: merge_matches.get_one::<String>("output").map(String::to_string),
            },
            _ => return Err(anyhow!("unrecognized subcommand")),
        };
        Ok(Arguments { config, verbose, mode })
    }
}

fn required(matches: &ArgMatches, name: &str) -> anyhow::Result<String> {
    matches
        .get_one::<String>(name)
        .map(String::to_string)
        .ok_or_else(|| anyhow!("missing argument: {name}"))
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Arguments:")?;
        if let Some(config) = &self.config {
            writeln!(f, "  config: {config}")?;
        }
        match &self.mode {
            Mode::Diagnostics { input, directory, project, policy } => {
                writeln!(f, "  mode: diagnostics")?;
                match input {
                    ErrorStream::Stdin => writeln!(f, "  input: <stdin>")?,
                    ErrorStream::File(file) => writeln!(f, "  input: {file}")?,
                }
                writeln!(f, "  directory: {directory}")?;
                writeln!(f, "  project: {project}")?;
                writeln!(f, "  allow outside: {}", policy.allow_outside)?;
                write!(f, "  keep outside warnings: {}", policy.keep_outside_warnings)
            }
            Mode::Merge { build_dir, project, output } => {
                writeln!(f, "  mode: merge")?;
                writeln!(f, "  build directory: {build_dir}")?;
                write!(f, "  project: {project}")?;
                if let Some(output) = output {
                    write!(f, "\n  output: {output}")?;
                }
                Ok(())
            }
        }
    }
}

/// Represents the command line interface of the application.
///
/// This describes how the user can interact with the application.
/// The different modes of the application are represented as subcommands.
pub fn cli() -> Command {
    command!()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .args(&[
            arg!(-v --verbose ... "Sets the level of verbosity").action(ArgAction::Count),
            arg!(-c --config <FILE> "Path of the config file"),
        ])
        .subcommand(
            Command::new(MODE_DIAGNOSTICS_SUBCOMMAND)
                .about("extracts the problem list from a captured compiler error stream")
                .args(&[
                    arg!(-i --input <FILE> "Path of the captured error stream, '-' for stdin")
                        .default_value(STDIN_MARKER),
                    arg!(-d --directory <DIR> "Working directory of the build").required(true),
                    arg!(-p --project <DIR> "Root directory of the project").required(true),
                    arg!(--"allow-outside" "Report diagnostics of files outside of the project")
                        .action(ArgAction::SetTrue),
                    arg!(--"keep-outside-warnings" "Keep the warnings of files outside of the project")
                        .action(ArgAction::SetTrue),
                ])
                .arg_required_else_help(true),
        )
        .subcommand(
            Command::new(MODE_MERGE_SUBCOMMAND)
                .about("merges the build output into the consolidated compilation database")
                .args(&[
                    arg!(-b --"build-dir" <DIR> "Build output directory of the toolchain").required(true),
                    arg!(-p --project <DIR> "Root directory of the project").required(true),
                    arg!(-o --output <FILE> "Path of the consolidated compilation database"),
                ])
                .arg_required_else_help(true),
        )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_diagnostics_call() {
        let execution = vec![
            "compdb-sync",
            "-c",
            "~/compdb-sync.yml",
            "-vv",
            "diagnostics",
            "--input",
            "stderr.txt",
            "--directory",
            "/tmp/build",
            "--project",
            "/home/me/sketch",
            "--allow-outside",
        ];

        let matches = cli().get_matches_from(execution);
        let arguments = Arguments::try_from(matches).unwrap();

        assert_eq!(
            arguments,
            Arguments {
                config: Some("~/compdb-sync.yml".into()),
                verbose: 2,
                mode: Mode::Diagnostics {
                    input: ErrorStream::File("stderr.txt".into()),
                    directory: "/tmp/build".into(),
                    project: "/home/me/sketch".into(),
                    policy: PolicyOverrides { allow_outside: true, keep_outside_warnings: false },
                },
            }
        );
    }

    #[test]
    fn test_diagnostics_defaults() {
        let execution = vec!["compdb-sync", "diagnostics", "-d", "/tmp/build", "-p", "/home/me/sketch"];

        let matches = cli().get_matches_from(execution);
        let arguments = Arguments::try_from(matches).unwrap();

        assert_eq!(
            arguments,
            Arguments {
                config: None,
                verbose: 0,
                mode: Mode::Diagnostics {
                    input: ErrorStream::Stdin,
                    directory: "/tmp/build".into(),
                    project: "/home/me/sketch".into(),
                    policy: PolicyOverrides::default(),
                },
            }
        );
    }

    #[test]
    fn test_merge_call() {
        let execution = vec![
            "compdb-sync",
            "merge",
            "--build-dir",
            "/tmp/build",
            "--project",
            "/home/me/sketch",
            "-o",
            "compile_commands.json",
        ];

        let matches = cli().get_matches_from(execution);
        let arguments = Arguments::try_from(matches).unwrap();

        assert_eq!(
            arguments,
            Arguments {
                config: None,
                verbose: 0,
                mode: Mode::Merge {
                    build_dir: "/tmp/build".into(),
                    project: "/home/me/sketch".into(),
                    output: Some("compile_commands.json".into()),
                },
            }
        );
    }

    #[test]
    fn test_merge_requires_build_dir() {
        let execution = vec!["compdb-sync", "merge", "--project", "/home/me/sketch"];

        let result = cli().try_get_matches_from(execution);

        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        let arguments = Arguments {
            config: None,
            verbose: 0,
            mode: Mode::Merge { build_dir: "/tmp/build".into(), project: "/home/me/sketch".into(), output: None },
        };

        assert_eq!(
            arguments.to_string(),
            "Arguments:\n  mode: merge\n  build directory: /tmp/build\n  project: /home/me/sketch"
        );
    }
}
