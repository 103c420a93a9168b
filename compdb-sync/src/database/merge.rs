// SPDX-License-Identifier: GPL-3.0-or-later

//! Merging the compilation data of a build into the consolidated database.
//!
//! One merge runs in two steps. `Merger::reconcile` computes the new
//! database in memory: the fresh entries of the build are filtered to the
//! project, normalized and relocated, then merged with the previous
//! database by key. `Merger::persist` writes the result back. Keeping the
//! steps apart means a failed write still hands back the merged database.

use super::artifact::{ArtifactProblem, ArtifactReader};
use super::entry::{CompileEntry, EntryKey};
use super::format::{FormatError, JsonCompilationDatabase, SerializationFormat, WritableFormat};
use super::statistics::MergeStatistics;
use super::storage::{Storage, StorageError};
use crate::arguments::Normalizer;
use crate::project::{FileIndex, ProjectBoundary};
use crate::{config, paths, sources};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Flags with a path value, either fused or as the next argument.
const PATH_FLAGS: &[&str] = &["-I", "-isystem", "-iquote", "-idirafter", "-o"];

/// The inputs of one merge.
#[derive(Clone, Copy, Debug)]
pub struct MergeRequest<'a> {
    /// The build output directory of the toolchain.
    pub build_dir: &'a Path,
    /// The sketch directory, the default base of the build cache entries.
    pub sketch_dir: &'a Path,
    /// The files owned by the project.
    pub project: &'a ProjectBoundary,
    /// The project files by name, to map build outputs back to them.
    pub files: &'a FileIndex,
    /// The location of the consolidated database.
    pub database: &'a Path,
}

/// The outcome of a merge.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MergeOutcome {
    /// The build left no compilation data behind; nothing was merged.
    NoArtifact,
    /// The number of fresh entries merged (can be zero).
    Merged { fresh: usize },
}

impl MergeOutcome {
    /// The merge count: the number of fresh entries, or `-1` when there
    /// was no compilation data.
    pub fn count(&self) -> i64 {
        match self {
            MergeOutcome::NoArtifact => -1,
            MergeOutcome::Merged { fresh } => i64::try_from(*fresh).unwrap_or(i64::MAX),
        }
    }
}

/// The result of the reconciliation.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeReport {
    pub outcome: MergeOutcome,
    /// The merged database, empty when there was no compilation data.
    pub database: Vec<CompileEntry>,
    pub statistics: MergeStatistics,
    pub problems: Vec<ArtifactProblem>,
}

/// Represents the errors of writing the merged database.
///
/// The merged database is kept in the error, nothing of the merge is lost.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Failed to serialize compilation database {path}: {source}")]
    Serialize {
        path: PathBuf,
        database: Vec<CompileEntry>,
        #[source]
        source: FormatError,
    },
    #[error("Failed to persist compilation database {path}: {source}")]
    Persist {
        path: PathBuf,
        database: Vec<CompileEntry>,
        #[source]
        source: StorageError,
    },
}

impl MergeError {
    /// The merged database which was not written.
    pub fn database(&self) -> &[CompileEntry] {
        match self {
            MergeError::Serialize { database, .. } | MergeError::Persist { database, .. } => database,
        }
    }
}

/// Where an entry belongs after the project filter.
enum Placement {
    /// The entry's file is a project file.
    Project(PathBuf),
    /// The entry's file was generated in the build directory from this project file.
    Retargeted(PathBuf),
    /// The entry's file is not part of the project.
    Outside,
}

/// Merges build output into the consolidated database.
pub struct Merger<'a> {
    storage: &'a dyn Storage,
    normalizer: Normalizer<'a>,
    artifacts: &'a config::Artifacts,
}

impl<'a> Merger<'a> {
    pub fn new(storage: &'a dyn Storage, normalizer: Normalizer<'a>, artifacts: &'a config::Artifacts) -> Self {
        Self { storage, normalizer, artifacts }
    }

    /// Reconciles and persists, when there was compilation data to merge.
    pub fn merge(&self, request: &MergeRequest) -> Result<MergeReport, MergeError> {
        let report = self.reconcile(request);
        if let MergeOutcome::Merged { .. } = report.outcome {
            self.persist(request.database, &report.database)?;
        }
        Ok(report)
    }

    /// Computes the merged database, without writing it.
    pub fn reconcile(&self, request: &MergeRequest) -> MergeReport {
        let mut statistics = MergeStatistics::default();

        let read = ArtifactReader::new(self.storage, self.artifacts).read(request.build_dir, request.sketch_dir);
        let Some(candidates) = read.artifact.into_entries() else {
            log::info!("No compilation data found in {}", request.build_dir.display());
            return MergeReport {
                outcome: MergeOutcome::NoArtifact,
                database: Vec::new(),
                statistics,
                problems: read.problems,
            };
        };
        statistics.candidates_read = candidates.len();

        let fresh = self.fresh_entries(candidates, request, &mut statistics);
        let previous = self.previous_entries(request.database);
        statistics.previous_entries = previous.len();
        statistics.fresh_entries = fresh.len();

        let database = self.combine(previous, fresh, request, &mut statistics);
        statistics.entries_written = database.len();

        MergeReport {
            outcome: MergeOutcome::Merged { fresh: statistics.fresh_entries },
            database,
            statistics,
            problems: read.problems,
        }
    }

    /// Writes the database through the storage.
    pub fn persist(&self, path: &Path, database: &[CompileEntry]) -> Result<(), MergeError> {
        let mut buffer = Vec::new();
        if let Err(source) = JsonCompilationDatabase::write(&mut buffer, database.iter().cloned()) {
            return Err(MergeError::Serialize { path: path.to_path_buf(), database: database.to_vec(), source });
        }
        self.storage.write(path, &buffer).map_err(|source| MergeError::Persist {
            path: path.to_path_buf(),
            database: database.to_vec(),
            source,
        })
    }

    /// Filters, normalizes and relocates the build's entries.
    ///
    /// A later entry with the same key replaces the earlier one.
    fn fresh_entries(
        &self,
        candidates: Vec<CompileEntry>,
        request: &MergeRequest,
        statistics: &mut MergeStatistics,
    ) -> Vec<CompileEntry> {
        let mut fresh: Vec<CompileEntry> = Vec::new();
        let mut index: HashMap<EntryKey, usize> = HashMap::new();

        for candidate in candidates {
            let target = match place(&candidate, request) {
                Placement::Project(target) => target,
                Placement::Retargeted(target) => {
                    statistics.entries_retargeted += 1;
                    target
                }
                Placement::Outside => {
                    log::debug!("Entry is outside of the project: {}", candidate.resolved_file().display());
                    statistics.entries_outside_project += 1;
                    continue;
                }
            };
            let Some(entry) = self.relocate(&candidate, &target) else {
                statistics.entries_unresolvable += 1;
                continue;
            };
            let key = entry.key();
            match index.get(&key) {
                Some(&position) => fresh[position] = entry,
                None => {
                    index.insert(key, fresh.len());
                    fresh.push(entry);
                }
            }
        }
        fresh
    }

    /// Reads the previous database. A missing or corrupt file reads as empty.
    fn previous_entries(&self, path: &Path) -> Vec<CompileEntry> {
        let content = match self.storage.read(path) {
            Ok(Some(content)) => content,
            Ok(None) => return Vec::new(),
            Err(error) => {
                log::warn!("Problems to read previous entries: {error}");
                return Vec::new();
            }
        };
        match JsonCompilationDatabase::read_and_ignore(content.as_slice(), |error| {
            log::warn!("Problems to read previous entries: {error}");
        }) {
            Ok(entries) => entries.collect(),
            Err(error) => {
                log::warn!("Previous compilation database {} is ignored: {error}", path.display());
                Vec::new()
            }
        }
    }

    /// Merges the fresh entries into the previous ones by key.
    ///
    /// Previous entries keep their position; a fresh entry replaces the
    /// previous one with the same key. The remaining fresh entries are
    /// appended. Untouched previous entries are kept only while their file
    /// still belongs to the project.
    fn combine(
        &self,
        previous: Vec<CompileEntry>,
        fresh: Vec<CompileEntry>,
        request: &MergeRequest,
        statistics: &mut MergeStatistics,
    ) -> Vec<CompileEntry> {
        let fresh_index: HashMap<EntryKey, usize> =
            fresh.iter().enumerate().map(|(position, entry)| (entry.key(), position)).collect();
        let mut fresh: Vec<Option<CompileEntry>> = fresh.into_iter().map(Some).collect();
        let mut seen: HashSet<EntryKey> = HashSet::new();
        let mut result = Vec::with_capacity(previous.len() + fresh.len());

        for entry in previous {
            let key = entry.key();
            if let Some(&position) = fresh_index.get(&key) {
                if let Some(replacement) = fresh[position].take() {
                    seen.insert(key);
                    result.push(replacement);
                }
                continue;
            }
            let Some(entry) = self.revalidate(entry, request) else {
                statistics.previous_pruned += 1;
                continue;
            };
            let key = entry.key();
            if fresh_index.contains_key(&key) || !seen.insert(key) {
                statistics.previous_pruned += 1;
                continue;
            }
            statistics.previous_kept += 1;
            result.push(entry);
        }
        result.extend(fresh.into_iter().flatten());
        result
    }

    /// Checks if a previous entry still belongs to the project.
    fn revalidate(&self, entry: CompileEntry, request: &MergeRequest) -> Option<CompileEntry> {
        match place(&entry, request) {
            Placement::Project(target) if self.storage.is_file(&target) => Some(entry),
            Placement::Retargeted(target) => self.relocate(&entry, &target),
            Placement::Project(target) => {
                log::debug!("Previous entry file is gone: {}", target.display());
                None
            }
            Placement::Outside => None,
        }
    }

    /// Normalizes the invocation and moves the entry to the target file.
    ///
    /// The directory becomes the target's parent and the file its name.
    /// Relative paths of the invocation are made absolute against the
    /// original directory, and the source argument names the target.
    fn relocate(&self, entry: &CompileEntry, target: &Path) -> Option<CompileEntry> {
        let (Some(directory), Some(file)) = (target.parent(), target.file_name()) else {
            log::debug!("Entry target has no file name: {}", target.display());
            return None;
        };
        let normalized = self.normalizer.normalize(&entry.invocation, &entry.directory);
        if normalized.arguments.is_empty() {
            return None;
        }
        let arguments = relocate_arguments(normalized.arguments, &entry.directory, &entry.resolved_file(), target);

        let relocated = CompileEntry {
            directory: directory.to_path_buf(),
            file: PathBuf::from(file),
            invocation: entry.invocation.with_tokens(arguments),
            output: entry.output.as_ref().map(|output| paths::resolve(&entry.directory, output)),
        };
        match relocated.validate() {
            Ok(entry) => Some(entry),
            Err(error) => {
                log::debug!("Entry is invalid after relocation: {error}");
                None
            }
        }
    }
}

/// Decides where the entry belongs.
fn place(entry: &CompileEntry, request: &MergeRequest) -> Placement {
    let resolved = entry.resolved_file();
    if entry.resolves_within(request.build_dir) {
        return match retarget(&resolved, request.files) {
            Some(target) if request.project.contains(target) => Placement::Retargeted(target.to_path_buf()),
            _ => Placement::Outside,
        };
    }
    if request.project.contains(&resolved) {
        Placement::Project(resolved)
    } else {
        Placement::Outside
    }
}

/// Finds the project file a build directory file was generated from.
///
/// A sketch translation `name.ino.cpp` is looked up as `name.ino` first.
fn retarget<'i>(generated: &Path, files: &'i FileIndex) -> Option<&'i Path> {
    let name = generated.file_name()?;
    let original: Option<OsString> = name
        .to_str()
        .and_then(|name| name.strip_suffix(sources::SKETCH_TRANSLATION_SUFFIX))
        .map(|stem| OsString::from(format!("{stem}.ino")));

    original
        .and_then(|original| files.lookup(&original))
        .or_else(|| files.lookup(name))
}

/// Rewrites the relative paths of the arguments to absolute ones.
///
/// The executable is kept as is. The argument naming the `source` file is
/// replaced by the `target` path.
fn relocate_arguments(arguments: Vec<String>, directory: &Path, source: &Path, target: &Path) -> Vec<String> {
    let absolute = |value: &str| -> String {
        if value.is_empty() || paths::is_absolute(Path::new(value)) {
            value.to_string()
        } else {
            paths::resolve(directory, Path::new(value)).to_string_lossy().into_owned()
        }
    };

    let mut result = Vec::with_capacity(arguments.len());
    let mut arguments = arguments.into_iter();
    result.extend(arguments.next());

    while let Some(argument) = arguments.next() {
        if PATH_FLAGS.contains(&argument.as_str()) {
            result.push(argument);
            result.extend(arguments.next().map(|value| absolute(&value)));
            continue;
        }
        if let Some((flag, value)) = PATH_FLAGS
            .iter()
            .find_map(|flag| argument.strip_prefix(flag).map(|value| (flag, value)))
        {
            result.push(format!("{flag}{}", absolute(value)));
            continue;
        }
        if sources::looks_like_a_source_file(&argument) {
            if paths::resolve(directory, Path::new(&argument)) == source {
                result.push(target.to_string_lossy().into_owned());
            } else {
                result.push(absolute(&argument));
            }
            continue;
        }
        result.push(argument);
    }
    result
}
