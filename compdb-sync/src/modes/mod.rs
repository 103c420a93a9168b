// SPDX-License-Identifier: GPL-3.0-or-later

mod diagnostics;
mod merge;

use crate::context::Context;
use crate::diagnostics::VisibilityPolicy;
use crate::project::ProjectBoundary;
use crate::{args, config, paths};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Represent the modes the application can run in.
///
/// To the user the modes are:
/// - diagnostics: turn a captured compiler error stream into a problem list.
/// - merge: fold the compilation data of a build into the consolidated database.
pub enum Mode {
    Diagnostics(diagnostics::DiagnosticsRun),
    Merge(merge::MergeRun),
}

impl Mode {
    /// Configure the application mode based on the command line arguments and the configuration.
    ///
    /// The paths of the command line are made absolute against the working
    /// directory of the invocation. The project directory must exist.
    pub fn configure(context: Context, args: args::Arguments, config: config::Main) -> Result<Self, ConfigurationError> {
        match args.mode {
            args::Mode::Diagnostics { input, directory, project, policy } => {
                log::debug!("Mode: extract diagnostics");

                let project = existing_directory(&context, &project)?;
                let boundary = project_boundary(&project, &config.project);

                let input = match input {
                    args::ErrorStream::Stdin => diagnostics::Input::Stdin,
                    args::ErrorStream::File(file) => {
                        let path = context.absolute(Path::new(&file));
                        if !path.is_file() {
                            return Err(ConfigurationError::InvalidConfiguration(format!(
                                "Error stream file not found: {file}"
                            )));
                        }
                        diagnostics::Input::File(path)
                    }
                };

                let mut visibility = VisibilityPolicy::from(&config.diagnostics);
                if policy.allow_outside {
                    visibility.allow_outside = true;
                }
                if policy.keep_outside_warnings {
                    visibility.skip_warnings_outside_project = false;
                }

                Ok(Self::Diagnostics(diagnostics::DiagnosticsRun::new(
                    input,
                    context.absolute(Path::new(&directory)),
                    boundary,
                    visibility,
                )))
            }
            args::Mode::Merge { build_dir, project, output } => {
                log::debug!("Mode: merge compilation database");

                let project = existing_directory(&context, &project)?;
                let boundary = project_boundary(&project, &config.project);
                let database = match output {
                    Some(output) => context.absolute(Path::new(&output)),
                    None => paths::resolve(&project, &config.output.database),
                };

                Ok(Self::Merge(merge::MergeRun::new(
                    context.absolute(Path::new(&build_dir)),
                    project,
                    boundary,
                    database,
                    config,
                )))
            }
        }
    }

    /// It actually runs the application mode.
    ///
    /// These errors are all run-time errors, the user were passing valid
    /// arguments and configurations.
    pub fn run(self) -> ExitCode {
        let status = match self {
            Self::Diagnostics(run) => run.run(),
            Self::Merge(run) => run.run(),
        };
        status.unwrap_or_else(|error| {
            log::error!("compdb-sync: {error}");
            ExitCode::FAILURE
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Project directory not found: {0}")]
    ProjectNotFound(PathBuf),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

fn existing_directory(context: &Context, directory: &str) -> Result<PathBuf, ConfigurationError> {
    let path = context.absolute(Path::new(directory));
    if path.is_dir() {
        Ok(path)
    } else {
        Err(ConfigurationError::ProjectNotFound(path))
    }
}

/// The project directory plus the configured extra roots. Relative roots
/// are taken from the project directory.
fn project_boundary(project: &Path, config: &config::Project) -> ProjectBoundary {
    let extra = config.roots.iter().map(|root| paths::resolve(project, root));
    ProjectBoundary::new(std::iter::once(project.to_path_buf()).chain(extra))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn context(directory: &Path) -> Context {
        Context { current_executable: PathBuf::from("/usr/bin/compdb-sync"), current_directory: directory.to_path_buf() }
    }

    fn merge_arguments(project: &str, output: Option<&str>) -> args::Arguments {
        args::Arguments {
            config: None,
            verbose: 0,
            mode: args::Mode::Merge {
                build_dir: "build".into(),
                project: project.into(),
                output: output.map(str::to_string),
            },
        }
    }

    #[test]
    fn test_missing_project_directory() {
        let dir = tempdir().unwrap();

        let result = Mode::configure(context(dir.path()), merge_arguments("missing", None), config::Main::default());

        assert!(matches!(result, Err(ConfigurationError::ProjectNotFound(path)) if path == dir.path().join("missing")));
    }

    #[test]
    fn test_merge_output_defaults_to_project_database() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sketch")).unwrap();

        let mode = Mode::configure(context(dir.path()), merge_arguments("sketch", None), config::Main::default()).unwrap();

        let Mode::Merge(run) = mode else { panic!("merge mode expected") };
        assert_eq!(run.database(), dir.path().join("sketch/.vscode/compile_commands.json"));
        assert_eq!(run.build_dir(), dir.path().join("build"));
    }

    #[test]
    fn test_merge_output_from_command_line() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sketch")).unwrap();

        let mode = Mode::configure(
            context(dir.path()),
            merge_arguments("sketch", Some("out/compile_commands.json")),
            config::Main::default(),
        )
        .unwrap();

        let Mode::Merge(run) = mode else { panic!("merge mode expected") };
        assert_eq!(run.database(), dir.path().join("out/compile_commands.json"));
    }

    #[test]
    fn test_diagnostics_flags_override_configuration() {
        let dir = tempdir().unwrap();
        let arguments = args::Arguments {
            config: None,
            verbose: 0,
            mode: args::Mode::Diagnostics {
                input: args::ErrorStream::Stdin,
                directory: ".".into(),
                project: ".".into(),
                policy: args::PolicyOverrides { allow_outside: true, keep_outside_warnings: true },
            },
        };

        let mode = Mode::configure(context(dir.path()), arguments, config::Main::default()).unwrap();

        let Mode::Diagnostics(run) = mode else { panic!("diagnostics mode expected") };
        assert_eq!(
            run.policy(),
            VisibilityPolicy { allow_outside: true, skip_warnings_outside_project: false }
        );
    }

    #[test]
    fn test_diagnostics_missing_input_file() {
        let dir = tempdir().unwrap();
        let arguments = args::Arguments {
            config: None,
            verbose: 0,
            mode: args::Mode::Diagnostics {
                input: args::ErrorStream::File("stderr.txt".into()),
                directory: ".".into(),
                project: ".".into(),
                policy: args::PolicyOverrides::default(),
            },
        };

        let result = Mode::configure(context(dir.path()), arguments, config::Main::default());

        assert!(matches!(result, Err(ConfigurationError::InvalidConfiguration(_))));
    }

    #[test]
    #[cfg(unix)]
    fn test_extra_roots_are_relative_to_project() {
        let project = Path::new("/home/me/sketch");
        let config = config::Project { roots: vec![PathBuf::from("../libraries/Shared"), PathBuf::from("/opt/lib")] };

        let boundary = project_boundary(project, &config);

        assert_eq!(
            boundary.roots(),
            &[
                PathBuf::from("/home/me/sketch"),
                PathBuf::from("/home/me/libraries/Shared"),
                PathBuf::from("/opt/lib")
            ]
        );
    }
}
