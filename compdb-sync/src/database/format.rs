// SPDX-License-Identifier: GPL-3.0-or-later

//! This module declares the file formats the engine reads and writes.
//!
//! - The JSON compilation database format, as declared by the Clang project.
//!   Both the toolchain's primary artifact and the consolidated database use it.
//! - The incremental build cache format of the toolchain.

use super::cache::CacheRecord;
use super::entry::{CompileEntry, EntryError};
use serde::de::DeserializeOwned;
use serde::ser::{SerializeSeq, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Represents errors that can occur while working with file formats.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Generic IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Format syntax error: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("Format semantic error: {0}")]
    Semantic(#[from] EntryError),
}

/// A trait representing a file format that can be read from.
///
/// File formats in this project are JSON arrays of values. The whole
/// document must be an array; a malformed element is reported as an error
/// item, and the remaining elements are still returned.
pub trait SerializationFormat<T> {
    /// Reads items from the specified reader, returning an iterator of results.
    ///
    /// Fails up front when the content is not a JSON array.
    fn read(reader: impl std::io::Read) -> Result<impl Iterator<Item = Result<T, FormatError>>, FormatError>;

    /// Reads items from the reader and ignores the malformed ones.
    fn read_and_ignore(
        reader: impl std::io::Read,
        message_writer: impl Fn(&str),
    ) -> Result<impl Iterator<Item = T>, FormatError> {
        let items = Self::read(reader)?;
        Ok(items.filter_map(move |result| match result {
            Ok(value) => Some(value),
            Err(error) => {
                message_writer(&error.to_string());
                None
            }
        }))
    }
}

/// A file format the engine also writes.
pub trait WritableFormat<T>: SerializationFormat<T> {
    /// Writes an iterator of items to the specified writer.
    fn write(writer: impl std::io::Write, items: impl Iterator<Item = T>) -> Result<(), FormatError>;
}

/// Parses the content as a JSON array, and each element on its own.
fn read_array<T: DeserializeOwned>(
    reader: impl std::io::Read,
) -> Result<impl Iterator<Item = Result<T, FormatError>>, FormatError> {
    let values: Vec<Value> = serde_json::from_reader(reader)?;
    Ok(values
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(FormatError::Syntax)))
}

/// The type represents a JSON compilation database format.
///
/// The format is a JSON array format, which is a sequence of JSON objects
/// enclosed in square brackets. Each object represents a compilation
/// command.
///
/// # Note
/// The format itself is defined in the LLVM project documentation.
/// https://clang.llvm.org/docs/JSONCompilationDatabase.html
pub struct JsonCompilationDatabase;

impl WritableFormat<CompileEntry> for JsonCompilationDatabase {
    fn write(writer: impl std::io::Write, entries: impl Iterator<Item = CompileEntry>) -> Result<(), FormatError> {
        let mut ser = serde_json::Serializer::pretty(writer);
        let mut seq = ser.serialize_seq(None)?;
        for entry in entries {
            // Ensure only valid entries are serialized.
            let entry = entry.validate()?;
            seq.serialize_element(&entry)?;
        }
        seq.end()?;
        Ok(())
    }
}

impl SerializationFormat<CompileEntry> for JsonCompilationDatabase {
    fn read(
        reader: impl std::io::Read,
    ) -> Result<impl Iterator<Item = Result<CompileEntry, FormatError>>, FormatError> {
        let entries = read_array::<CompileEntry>(reader)?;
        // Ensure only valid entries are returned.
        Ok(entries.map(|result| result.and_then(|entry| entry.validate().map_err(FormatError::Semantic))))
    }
}

/// The type represents the incremental build cache of the toolchain.
///
/// The engine only reads the cache.
pub struct BuildCacheFormat;

impl SerializationFormat<CacheRecord> for BuildCacheFormat {
    fn read(
        reader: impl std::io::Read,
    ) -> Result<impl Iterator<Item = Result<CacheRecord, FormatError>>, FormatError> {
        read_array::<CacheRecord>(reader)
    }
}
