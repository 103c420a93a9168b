// SPDX-License-Identifier: GPL-3.0-or-later

//! The entry of a JSON compilation database.
//!
//! The definition of the JSON compilation database files is done in the
//! LLVM project [documentation](https://clang.llvm.org/docs/JSONCompilationDatabase.html).
//! An entry carries its compiler invocation either as an argument list or
//! as a single command string; the form read is the form written back.

mod type_de;

use crate::arguments::Invocation;
use crate::paths;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Represents an entry of the compilation database.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompileEntry {
    /// The working directory of the compilation. All relative paths of the
    /// invocation and the `file` field are relative to this directory.
    pub directory: PathBuf,
    /// The main translation unit source processed by this compilation step.
    pub file: PathBuf,
    /// The compiler invocation, `arguments[0]` is the executable.
    pub invocation: Invocation,
    /// The name of the output created by this compilation step.
    pub output: Option<PathBuf>,
}

/// The identity of an entry inside a consolidated database.
pub type EntryKey = (PathBuf, PathBuf);

impl CompileEntry {
    /// Create an entry from an argument list.
    pub fn from_arguments(directory: impl Into<PathBuf>, file: impl Into<PathBuf>, arguments: Vec<String>) -> Self {
        Self {
            directory: directory.into(),
            file: file.into(),
            invocation: Invocation::Arguments(arguments),
            output: None,
        }
    }

    /// Create an entry from a shell command string.
    pub fn from_command(directory: impl Into<PathBuf>, file: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file: file.into(),
            invocation: Invocation::Command(command.into()),
            output: None,
        }
    }

    /// Semantic validation of the entry.
    pub fn validate(self) -> Result<Self, EntryError> {
        if self.file.as_os_str().is_empty() {
            return Err(EntryError::EmptyFileName);
        }
        if self.directory.as_os_str().is_empty() {
            return Err(EntryError::EmptyDirectory);
        }
        match self.tokens().first() {
            None => Err(EntryError::EmptyInvocation),
            Some(executable) if executable.is_empty() => Err(EntryError::EmptyExecutable),
            Some(_) => Ok(self),
        }
    }

    /// The argument tokens of the invocation.
    pub fn tokens(&self) -> Vec<String> {
        self.invocation.tokens()
    }

    /// The source file resolved against the working directory.
    pub fn resolved_file(&self) -> PathBuf {
        paths::resolve(&self.directory, &self.file)
    }

    /// The key of the entry: the lexically normalized directory and file.
    pub fn key(&self) -> EntryKey {
        (paths::normalize(&self.directory), paths::normalize(&self.file))
    }

    /// Checks if the entry was compiled inside the given directory.
    pub fn resolves_within(&self, directory: &Path) -> bool {
        paths::is_within(&self.resolved_file(), directory)
    }

    /// Constructor method for testing purposes.
    #[cfg(test)]
    pub fn from_arguments_str(directory: &str, file: &str, arguments: Vec<&str>) -> Self {
        Self::from_arguments(directory, file, arguments.into_iter().map(String::from).collect())
    }
}

impl Serialize for CompileEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let fields = if self.output.is_some() { 4 } else { 3 };
        let mut state = serializer.serialize_struct("CompileEntry", fields)?;
        state.serialize_field("directory", &self.directory)?;
        state.serialize_field("file", &self.file)?;
        match &self.invocation {
            Invocation::Arguments(arguments) => state.serialize_field("arguments", arguments)?,
            Invocation::Command(command) => state.serialize_field("command", command)?,
        }
        if let Some(output) = &self.output {
            state.serialize_field("output", output)?;
        }
        state.end()
    }
}

/// Represents the possible errors that can occur when validating an entry.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("Entry has an empty file field")]
    EmptyFileName,
    #[error("Entry has an empty directory field")]
    EmptyDirectory,
    #[error("Entry has no compiler invocation")]
    EmptyInvocation,
    #[error("Entry has an empty executable")]
    EmptyExecutable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate() {
        let valid = CompileEntry::from_arguments_str("/build", "main.c", vec!["gcc", "-c", "main.c"]);
        assert!(valid.validate().is_ok());

        let cases = [
            CompileEntry::from_arguments_str("/build", "", vec!["gcc", "main.c"]),
            CompileEntry::from_arguments_str("", "main.c", vec!["gcc", "main.c"]),
            CompileEntry::from_arguments_str("/build", "main.c", vec![]),
            CompileEntry::from_arguments_str("/build", "main.c", vec!["", "main.c"]),
            CompileEntry::from_command("/build", "main.c", "   "),
        ];
        for entry in cases {
            assert!(entry.validate().is_err());
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_key_is_normalized() {
        let first = CompileEntry::from_arguments_str("/project/./src", "main.c", vec!["gcc"]);
        let second = CompileEntry::from_arguments_str("/project/src/sub/..", "./main.c", vec!["gcc"]);

        assert_eq!(first.key(), second.key());
        assert_eq!(first.key(), (PathBuf::from("/project/src"), PathBuf::from("main.c")));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolved_file() {
        let relative = CompileEntry::from_arguments_str("/project/build", "../src/main.c", vec!["gcc"]);
        let absolute = CompileEntry::from_arguments_str("/project/build", "/opt/core/main.cpp", vec!["gcc"]);

        assert_eq!(relative.resolved_file(), PathBuf::from("/project/src/main.c"));
        assert_eq!(absolute.resolved_file(), PathBuf::from("/opt/core/main.cpp"));
        assert!(relative.resolves_within(Path::new("/project")));
        assert!(!absolute.resolves_within(Path::new("/project")));
    }

    #[test]
    fn test_serialize_keeps_invocation_form() {
        let arguments = CompileEntry::from_arguments_str("/build", "main.c", vec!["gcc", "main.c"]);
        let command = CompileEntry::from_command("/build", "main.c", "gcc main.c");

        assert_eq!(
            serde_json::to_value(&arguments).unwrap(),
            json!({ "directory": "/build", "file": "main.c", "arguments": ["gcc", "main.c"] })
        );
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({ "directory": "/build", "file": "main.c", "command": "gcc main.c" })
        );
    }

    #[test]
    fn test_serialize_output_when_present() {
        let mut entry = CompileEntry::from_arguments_str("/build", "main.c", vec!["gcc", "main.c"]);
        entry.output = Some(PathBuf::from("main.o"));

        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["output"], json!("main.o"));
    }
}
