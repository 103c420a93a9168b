// SPDX-License-Identifier: GPL-3.0-or-later

//! This module defines the configuration of the application.
//!
//! The configuration is either loaded from a file or used with default
//! values, which are defined in the code.
//!
//! The configuration file syntax is based on the YAML format.
//! The default configuration file name is `compdb-sync.yml`.
//!
//! The configuration file location is searched in the following order:
//! 1. The current working directory
//! 2. The local configuration directory of the user
//! 3. The configuration directory of the user
//! 4. The local configuration directory of the application
//! 5. The configuration directory of the application
//!
//! ```yaml
//! schema: "1.0"
//!
//! project:
//!   roots:
//!     - /home/me/Arduino/libraries/Display
//!
//! diagnostics:
//!   skip_warnings_outside_project: true
//!   allow_outside_diagnostics: false
//!
//! arguments:
//!   implicit_header: Arduino.h
//!
//! artifacts:
//!   compilation_database: compile_commands.json
//!   build_cache: compile_tasks.json
//!   build_options: build.options.json
//!   null_devices: ["/dev/null", "NUL", "nul"]
//!
//! output:
//!   database: .vscode/compile_commands.json
//! ```

// Re-Export the types and the loader module content.
pub use loader::{ConfigError, Loader};
pub use types::*;
pub use validation::Validator;

mod types {
    use serde::Deserialize;
    use std::fmt;
    use std::path::PathBuf;

    /// Represents the application configuration.
    #[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Main {
        #[serde(deserialize_with = "validate_schema_version")]
        pub schema: String,
        #[serde(default)]
        pub project: Project,
        #[serde(default)]
        pub diagnostics: Diagnostics,
        #[serde(default)]
        pub arguments: Arguments,
        #[serde(default)]
        pub artifacts: Artifacts,
        #[serde(default)]
        pub output: Output,
    }

    impl Default for Main {
        fn default() -> Self {
            Self {
                schema: String::from(SUPPORTED_SCHEMA_VERSION),
                project: Project::default(),
                diagnostics: Diagnostics::default(),
                arguments: Arguments::default(),
                artifacts: Artifacts::default(),
                output: Output::default(),
            }
        }
    }

    impl fmt::Display for Main {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "Configuration:")?;
            let yaml_string = serde_yml::to_string(self).map_err(|_| fmt::Error)?;
            for line in yaml_string.lines() {
                writeln!(f, "{}", line)?;
            }
            Ok(())
        }
    }

    /// Additional directories which belong to the project.
    ///
    /// The project directory given on the command line is always part of
    /// the project, these roots extend it (e.g. with local libraries).
    #[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Project {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub roots: Vec<PathBuf>,
    }

    /// Visibility policy of diagnostics reported for files outside of the project.
    #[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Diagnostics {
        #[serde(default = "default_enabled")]
        pub skip_warnings_outside_project: bool,
        #[serde(default)]
        pub allow_outside_diagnostics: bool,
    }

    impl Default for Diagnostics {
        fn default() -> Self {
            Self { skip_warnings_outside_project: true, allow_outside_diagnostics: false }
        }
    }

    /// Argument normalization configuration.
    #[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Arguments {
        /// The header every translation unit includes implicitly. `null`
        /// disables the injection of the `-include` flag.
        #[serde(default = "default_implicit_header")]
        pub implicit_header: Option<String>,
    }

    impl Default for Arguments {
        fn default() -> Self {
            Self { implicit_header: default_implicit_header() }
        }
    }

    /// File names of the build artifacts inside the build output directory.
    #[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Artifacts {
        #[serde(default = "default_compilation_database")]
        pub compilation_database: PathBuf,
        #[serde(default = "default_build_cache")]
        pub build_cache: PathBuf,
        #[serde(default = "default_build_options")]
        pub build_options: PathBuf,
        /// Output targets which mean the compile task produced no object.
        #[serde(default = "default_null_devices")]
        pub null_devices: Vec<String>,
    }

    impl Default for Artifacts {
        fn default() -> Self {
            Self {
                compilation_database: default_compilation_database(),
                build_cache: default_build_cache(),
                build_options: default_build_options(),
                null_devices: default_null_devices(),
            }
        }
    }

    /// Location of the consolidated compilation database.
    #[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Output {
        /// Relative paths are relative to the project directory.
        #[serde(default = "default_output_database")]
        pub database: PathBuf,
    }

    impl Default for Output {
        fn default() -> Self {
            Self { database: default_output_database() }
        }
    }

    const SUPPORTED_SCHEMA_VERSION: &str = "1.0";

    fn default_enabled() -> bool {
        true
    }

    fn default_implicit_header() -> Option<String> {
        Some(String::from("Arduino.h"))
    }

    fn default_compilation_database() -> PathBuf {
        PathBuf::from("compile_commands.json")
    }

    fn default_build_cache() -> PathBuf {
        PathBuf::from("compile_tasks.json")
    }

    fn default_build_options() -> PathBuf {
        PathBuf::from("build.options.json")
    }

    fn default_null_devices() -> Vec<String> {
        vec![String::from("/dev/null"), String::from("NUL"), String::from("nul")]
    }

    fn default_output_database() -> PathBuf {
        PathBuf::from(".vscode").join("compile_commands.json")
    }

    // Custom deserialization function to validate the schema version
    fn validate_schema_version<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let schema: String = Deserialize::deserialize(deserializer)?;
        if schema != SUPPORTED_SCHEMA_VERSION {
            use serde::de::Error;
            Err(Error::custom(format!(
                "Unsupported schema version: {schema}. Expected: {SUPPORTED_SCHEMA_VERSION}"
            )))
        } else {
            Ok(schema)
        }
    }
}

pub mod validation {

    use super::types::*;
    use std::path::Path;
    use thiserror::Error;

    /// Trait for validating configuration objects
    pub trait Validator<T> {
        type Error: std::error::Error;

        fn validate(config: &T) -> Result<(), Self::Error>;
    }

    /// Validation errors for configuration
    #[derive(Debug, Error)]
    pub enum ValidationError {
        #[error("Empty string value for field '{field}'")]
        EmptyString { field: String },
        #[error("Duplicate {field} entry at: {idx}")]
        DuplicateEntry { field: &'static str, idx: usize },
        #[error("Invalid path for field '{field}': {message}")]
        InvalidPath { field: &'static str, message: &'static str },
        #[error("Multiple validation errors: {errors:?}")]
        Multiple { errors: Vec<ValidationError> },
    }

    /// Combinator for collecting and handling validation errors
    #[derive(Default)]
    struct ValidationCollector {
        errors: Vec<ValidationError>,
    }

    impl ValidationCollector {
        fn new() -> Self {
            Self { errors: Vec::new() }
        }

        fn add(&mut self, error: ValidationError) {
            self.errors.push(error);
        }

        fn add_result(&mut self, result: Result<(), ValidationError>) {
            if let Err(error) = result {
                match error {
                    ValidationError::Multiple { errors } => {
                        self.errors.extend(errors);
                    }
                    single_error => self.errors.push(single_error),
                }
            }
        }

        fn check_not_empty(&mut self, value: &Path, field: impl Into<String>) {
            if value.as_os_str().is_empty() {
                self.add(ValidationError::EmptyString { field: field.into() });
            }
        }

        fn finish(mut self) -> Result<(), ValidationError> {
            match self.errors.len() {
                0 => Ok(()),
                1 => Err(self.errors.remove(0)),
                _ => Err(ValidationError::Multiple { errors: self.errors }),
            }
        }
    }

    impl Validator<Main> for Main {
        type Error = ValidationError;

        fn validate(config: &Main) -> Result<(), Self::Error> {
            let mut collector = ValidationCollector::new();

            collector.add_result(Project::validate(&config.project));
            collector.add_result(Arguments::validate(&config.arguments));
            collector.add_result(Artifacts::validate(&config.artifacts));
            collector.add_result(Output::validate(&config.output));

            collector.finish()
        }
    }

    impl Validator<Project> for Project {
        type Error = ValidationError;

        fn validate(config: &Project) -> Result<(), Self::Error> {
            let mut collector = ValidationCollector::new();

            let mut seen_roots = std::collections::HashSet::new();
            for (idx, root) in config.roots.iter().enumerate() {
                collector.check_not_empty(root, format!("project.roots[{}]", idx));
                if !seen_roots.insert(root) {
                    collector.add(ValidationError::DuplicateEntry { field: "project.roots", idx });
                }
            }

            collector.finish()
        }
    }

    impl Validator<Arguments> for Arguments {
        type Error = ValidationError;

        fn validate(config: &Arguments) -> Result<(), Self::Error> {
            match &config.implicit_header {
                Some(header) if header.trim().is_empty() => {
                    Err(ValidationError::EmptyString { field: String::from("arguments.implicit_header") })
                }
                _ => Ok(()),
            }
        }
    }

    impl Validator<Artifacts> for Artifacts {
        type Error = ValidationError;

        fn validate(config: &Artifacts) -> Result<(), Self::Error> {
            let mut collector = ValidationCollector::new();

            collector.check_not_empty(&config.compilation_database, "artifacts.compilation_database");
            collector.check_not_empty(&config.build_cache, "artifacts.build_cache");
            collector.check_not_empty(&config.build_options, "artifacts.build_options");
            for (idx, device) in config.null_devices.iter().enumerate() {
                collector.check_not_empty(Path::new(device), format!("artifacts.null_devices[{}]", idx));
            }

            collector.finish()
        }
    }

    impl Validator<Output> for Output {
        type Error = ValidationError;

        fn validate(config: &Output) -> Result<(), Self::Error> {
            if config.database.as_os_str().is_empty() {
                return Err(ValidationError::EmptyString { field: String::from("output.database") });
            }
            if config.database.file_name().is_none() {
                return Err(ValidationError::InvalidPath {
                    field: "output.database",
                    message: "must name a file",
                });
            }
            Ok(())
        }
    }

}

pub mod loader {
    use super::{Main, Validator};
    use directories::{BaseDirs, ProjectDirs};
    use log::{debug, info};
    use std::fs::OpenOptions;
    use std::path::{Path, PathBuf};
    use thiserror::Error;

    const CONFIG_FILE_NAME: &str = "compdb-sync.yml";

    pub struct Loader {}

    impl Loader {
        /// Loads the configuration from the specified file or the default locations.
        ///
        /// If the configuration file is specified, it will be used. Otherwise, the default locations
        /// will be searched for the configuration file. If the configuration file is not found, the
        /// default configuration will be returned.
        pub fn load(context: &crate::context::Context, filename: &Option<String>) -> Result<Main, ConfigError> {
            if let Some(path) = filename {
                // If the configuration file is specified, use it.
                Self::from_file(Path::new(path))
            } else {
                // Otherwise, try to find the configuration file in the default locations.
                let locations = Self::file_locations(context);
                for location in locations {
                    debug!("Checking configuration file: {}", location.display());
                    if location.exists() {
                        return Self::from_file(location.as_path());
                    }
                }
                // If the configuration file is not found, return the default configuration.
                debug!("Configuration file not found. Using the default configuration.");
                Ok(Main::default())
            }
        }

        /// The default locations where the configuration file can be found.
        ///
        /// The locations are searched in the following order:
        /// - The current working directory.
        /// - The local configuration directory of the user.
        /// - The configuration directory of the user.
        /// - The local configuration directory of the application.
        /// - The configuration directory of the application.
        fn file_locations(context: &crate::context::Context) -> Vec<PathBuf> {
            let mut locations = Vec::new();

            locations.push(context.current_directory.clone());
            if let Some(base_dirs) = BaseDirs::new() {
                locations.push(base_dirs.config_local_dir().to_path_buf());
                locations.push(base_dirs.config_dir().to_path_buf());
            }

            if let Some(proj_dirs) = ProjectDirs::from("io.github", "compdb-sync", "compdb-sync") {
                locations.push(proj_dirs.config_local_dir().to_path_buf());
                locations.push(proj_dirs.config_dir().to_path_buf());
            }
            // filter out duplicate elements from the list
            locations.dedup();
            // append the default configuration file name to the locations
            locations.iter().map(|p| p.join(CONFIG_FILE_NAME)).collect()
        }

        /// Loads the configuration from the specified file.
        pub fn from_file(path: &Path) -> Result<Main, ConfigError> {
            info!("Loading configuration file: {}", path.display());

            let reader = OpenOptions::new()
                .read(true)
                .open(path)
                .map_err(|source| ConfigError::FileAccess { path: path.to_path_buf(), source })?;

            let content: Main = Self::from_reader(reader)
                .map_err(|source| ConfigError::ParseError { path: path.to_path_buf(), source })?;

            // Validate the loaded configuration
            Main::validate(&content)
                .map_err(|source| ConfigError::ValidationError { path: path.to_path_buf(), source })?;

            Ok(content)
        }

        /// Define the deserialization format of the config file.
        fn from_reader<R, T>(rdr: R) -> serde_yml::Result<T>
        where
            R: std::io::Read,
            T: serde::de::DeserializeOwned,
        {
            serde_yml::from_reader(rdr)
        }
    }

    /// Represents all possible configuration-related errors.
    #[derive(Debug, Error)]
    pub enum ConfigError {
        /// Error when opening or reading a configuration file.
        #[error("Failed to access configuration file '{path}': {source}")]
        FileAccess {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
        /// Error when parsing the configuration file format.
        #[error("Failed to parse configuration from file '{path}': {source}")]
        ParseError {
            path: PathBuf,
            #[source]
            source: serde_yml::Error,
        },
        /// Error when configuration validation fails.
        #[error("Configuration validation failed for '{path}': {source}")]
        ValidationError {
            path: PathBuf,
            #[source]
            source: crate::config::validation::ValidationError,
        },
    }

}
