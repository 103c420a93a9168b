// SPDX-License-Identifier: GPL-3.0-or-later

//! Classification of the build output directory.
//!
//! The build output carries compilation data in one of two shapes: the
//! toolchain's own compilation database, or its incremental build cache.
//! Which one is used gets decided here, once, when reading. Everything
//! that goes wrong on the way is recorded as an `ArtifactProblem`; none of
//! them is an error for the caller.

use super::cache::{self, BuildCacheEntry, BuildOptions};
use super::entry::CompileEntry;
use super::format::{BuildCacheFormat, JsonCompilationDatabase, SerializationFormat};
use super::storage::Storage;
use crate::config;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The compilation data found in the build output directory.
#[derive(Clone, Debug, PartialEq)]
pub enum BuildArtifact {
    /// The compilation database written by the toolchain.
    Primary(Vec<CompileEntry>),
    /// The incremental build cache, the fallback source.
    Cache(BuildCache),
    /// Nothing usable was found.
    Absent,
}

/// The classified build cache with the directory its paths are relative to.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildCache {
    pub entries: Vec<BuildCacheEntry>,
    pub base_directory: PathBuf,
}

impl BuildArtifact {
    /// Converts the artifact into compilation database entries.
    ///
    /// Returns `None` when there is no compilation data. An empty primary
    /// database is still compilation data; an empty reconstruction is not.
    pub fn into_entries(self) -> Option<Vec<CompileEntry>> {
        match self {
            BuildArtifact::Primary(entries) => Some(entries),
            BuildArtifact::Cache(cache) => {
                let entries = cache::reconstruct(&cache.entries, &cache.base_directory);
                if entries.is_empty() { None } else { Some(entries) }
            }
            BuildArtifact::Absent => None,
        }
    }
}

/// Represents the non-fatal problems met while reading the build output.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ArtifactProblem {
    #[error("Build artifact not found: {0}")]
    Missing(PathBuf),
    #[error("Build artifact {path} is malformed: {message}")]
    Malformed { path: PathBuf, message: String },
    #[error("Build artifact {path} is unreadable: {message}")]
    Unreadable { path: PathBuf, message: String },
    #[error("Build artifact {path} has an invalid entry: {message}")]
    InvalidEntry { path: PathBuf, message: String },
}

/// The result of reading the build output directory.
#[derive(Clone, Debug, PartialEq)]
pub struct ArtifactRead {
    pub artifact: BuildArtifact,
    pub problems: Vec<ArtifactProblem>,
}

/// Reads the build output directory through the storage.
pub struct ArtifactReader<'a> {
    storage: &'a dyn Storage,
    names: &'a config::Artifacts,
}

impl<'a> ArtifactReader<'a> {
    pub fn new(storage: &'a dyn Storage, names: &'a config::Artifacts) -> Self {
        Self { storage, names }
    }

    /// Reads the compilation data of the build output directory.
    ///
    /// The primary compilation database is preferred. When it is missing or
    /// is not a JSON array, the build cache is read instead. The build
    /// options file may override the `sketch_dir` as the base directory of
    /// the cache entries.
    pub fn read(&self, build_dir: &Path, sketch_dir: &Path) -> ArtifactRead {
        let mut problems = Vec::new();

        let artifact = match self.read_primary(build_dir, &mut problems) {
            Some(entries) => BuildArtifact::Primary(entries),
            None => match self.read_cache(build_dir, sketch_dir, &mut problems) {
                Some(cache) => BuildArtifact::Cache(cache),
                None => BuildArtifact::Absent,
            },
        };

        for problem in &problems {
            match problem {
                ArtifactProblem::Missing(_) => log::info!("{problem}"),
                _ => log::warn!("{problem}"),
            }
        }
        ArtifactRead { artifact, problems }
    }

    fn read_primary(&self, build_dir: &Path, problems: &mut Vec<ArtifactProblem>) -> Option<Vec<CompileEntry>> {
        let path = build_dir.join(&self.names.compilation_database);
        let content = self.read_file(&path, problems)?;

        match JsonCompilationDatabase::read(content.as_slice()) {
            Ok(results) => {
                let mut entries = Vec::new();
                for result in results {
                    match result {
                        Ok(entry) => entries.push(entry),
                        Err(error) => problems.push(ArtifactProblem::InvalidEntry {
                            path: path.clone(),
                            message: error.to_string(),
                        }),
                    }
                }
                Some(entries)
            }
            Err(error) => {
                problems.push(ArtifactProblem::Malformed { path, message: error.to_string() });
                None
            }
        }
    }

    fn read_cache(
        &self,
        build_dir: &Path,
        sketch_dir: &Path,
        problems: &mut Vec<ArtifactProblem>,
    ) -> Option<BuildCache> {
        let path = build_dir.join(&self.names.build_cache);
        let content = self.read_file(&path, problems)?;

        let records = match BuildCacheFormat::read(content.as_slice()) {
            Ok(records) => records,
            Err(error) => {
                problems.push(ArtifactProblem::Malformed { path, message: error.to_string() });
                return None;
            }
        };
        let mut entries = Vec::new();
        for record in records {
            match record {
                Ok(record) => entries.push(BuildCacheEntry::classify(record, &self.names.null_devices)),
                Err(error) => problems.push(ArtifactProblem::InvalidEntry {
                    path: path.clone(),
                    message: error.to_string(),
                }),
            }
        }

        let options = self.read_build_options(build_dir, problems);
        Some(BuildCache { entries, base_directory: options.base_directory(sketch_dir) })
    }

    fn read_build_options(&self, build_dir: &Path, problems: &mut Vec<ArtifactProblem>) -> BuildOptions {
        let path = build_dir.join(&self.names.build_options);
        match self.storage.read(&path) {
            Ok(Some(content)) => serde_json::from_slice(&content).unwrap_or_else(|error| {
                problems.push(ArtifactProblem::Malformed { path, message: error.to_string() });
                BuildOptions::default()
            }),
            Ok(None) => BuildOptions::default(),
            Err(error) => {
                problems.push(ArtifactProblem::Unreadable { path, message: error.to_string() });
                BuildOptions::default()
            }
        }
    }

    fn read_file(&self, path: &Path, problems: &mut Vec<ArtifactProblem>) -> Option<Vec<u8>> {
        match self.storage.read(path) {
            Ok(Some(content)) => Some(content),
            Ok(None) => {
                problems.push(ArtifactProblem::Missing(path.to_path_buf()));
                None
            }
            Err(error) => {
                problems.push(ArtifactProblem::Unreadable {
                    path: path.to_path_buf(),
                    message: error.to_string(),
                });
                None
            }
        }
    }
}
