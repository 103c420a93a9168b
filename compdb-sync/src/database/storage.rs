// SPDX-License-Identifier: GPL-3.0-or-later

//! The file read/write boundary of the engine.
//!
//! Every file the engine touches (build artifacts, response files, the
//! consolidated database) goes through the `Storage` trait. Reads are
//! single-shot; writes replace the whole file atomically.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;

/// Abstraction over the filesystem operations the engine needs.
#[cfg_attr(test, mockall::automock)]
pub trait Storage {
    /// Reads the whole file. Returns `Ok(None)` when the file does not exist.
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replaces the content of the file.
    ///
    /// Implementations must not leave a partially written file behind.
    fn write(&self, path: &Path, content: &[u8]) -> Result<(), StorageError>;

    /// Checks if the path names an existing regular file.
    fn is_file(&self, path: &Path) -> bool;
}

/// Represents errors of the storage boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read file {0}: {1}")]
    Read(PathBuf, #[source] io::Error),
    #[error("Failed to write file {0}: {1}")]
    Write(PathBuf, #[source] io::Error),
}

/// The storage backed by the local filesystem.
///
/// Writes go to a temporary file in the destination directory first, which
/// is then renamed over the final file name.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileStorage;

impl Storage for FileStorage {
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(path) {
            Ok(content) => Ok(Some(content)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(StorageError::Read(path.to_path_buf(), error)),
        }
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<(), StorageError> {
        let to_error = |error: io::Error| StorageError::Write(path.to_path_buf(), error);

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(directory).map_err(to_error)?;

        let mut temp = tempfile::NamedTempFile::new_in(directory).map_err(to_error)?;
        temp.write_all(content).map_err(to_error)?;
        temp.flush().map_err(to_error)?;
        temp.persist(path).map_err(|error| to_error(error.error))?;

        Ok(())
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();

        let result = FileStorage.read(&dir.path().join("missing.json")).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_read_directory_fails() {
        let dir = tempdir().unwrap();

        let result = FileStorage.read(dir.path());

        assert!(matches!(result, Err(StorageError::Read(_, _))));
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let target = dir.path().join(".vscode").join("compile_commands.json");

        FileStorage.write(&target, b"[]").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "[]");
        assert!(FileStorage.is_file(&target));
    }

    #[test]
    fn test_write_replaces_content_without_leftovers() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("compile_commands.json");
        fs::write(&target, "previous content").unwrap();

        FileStorage.write(&target, b"[]").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "[]");
        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_write_into_file_path_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let result = FileStorage.write(&blocker.join("compile_commands.json"), b"[]");

        assert!(matches!(result, Err(StorageError::Write(_, _))));
    }
}
