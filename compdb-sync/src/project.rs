// SPDX-License-Identifier: GPL-3.0-or-later

//! Project ownership of files.
//!
//! The `ProjectBoundary` decides whether a path belongs to the user's
//! project, which drives both the diagnostic visibility policy and the
//! filtering of compilation database entries. The `FileIndex` is a lookup
//! table from file name to the project files carrying that name. It is
//! built by the caller for the duration of one merge and lets the merger
//! map files generated in the build directory back to their project origin.

use crate::{paths, sources};
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// The set of directory roots that belong to the project.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProjectBoundary {
    roots: Vec<PathBuf>,
}

impl ProjectBoundary {
    /// Creates a boundary from the given roots.
    ///
    /// Roots are normalized lexically and deduplicated, the order is kept.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut normalized: Vec<PathBuf> = Vec::new();
        for root in roots {
            let root = paths::normalize(root.as_ref());
            if !normalized.contains(&root) {
                normalized.push(root);
            }
        }
        Self { roots: normalized }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Checks if the path lies under any of the project roots.
    pub fn contains(&self, path: &Path) -> bool {
        let path = paths::normalize(path);
        self.roots.iter().any(|root| path.starts_with(root))
    }
}

/// Lookup table from file name to the project files with that name.
#[derive(Clone, Debug, Default)]
pub struct FileIndex {
    by_name: HashMap<OsString, Vec<PathBuf>>,
}

impl FileIndex {
    /// Builds the index from an explicit list of files.
    ///
    /// Files sharing a name are kept in sorted order, so lookups are stable.
    pub fn from_paths<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut by_name: HashMap<OsString, Vec<PathBuf>> = HashMap::new();
        for file in files {
            let file = paths::normalize(&file.into());
            if let Some(name) = file.file_name() {
                by_name.entry(name.to_os_string()).or_default().push(file);
            }
        }
        for candidates in by_name.values_mut() {
            candidates.sort();
            candidates.dedup();
        }
        Self { by_name }
    }

    /// Walks the project roots and indexes every source file found.
    ///
    /// Hidden entries and the `excluded` directories (typically the build
    /// directory) are not visited. Ignore files are not consulted.
    /// Unreadable entries are logged and skipped.
    pub fn scan(boundary: &ProjectBoundary, excluded: &[PathBuf]) -> Self {
        let Some((first, rest)) = boundary.roots().split_first() else {
            return Self::default();
        };
        let excluded: Vec<PathBuf> = excluded.iter().map(|path| paths::normalize(path)).collect();

        let mut builder = WalkBuilder::new(first);
        for root in rest {
            builder.add(root);
        }
        let walker = builder
            .standard_filters(false)
            .hidden(true)
            .filter_entry(move |entry| !excluded.iter().any(|skip| entry.path().starts_with(skip)))
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    log::debug!("Skipping project entry: {error}");
                    continue;
                }
            };
            if entry.file_type().is_some_and(|file_type| file_type.is_file())
                && sources::is_source_path(entry.path())
            {
                files.push(entry.into_path());
            }
        }
        log::debug!("Indexed {} project source files", files.len());
        Self::from_paths(files)
    }

    /// Returns the first project file with the given name.
    pub fn lookup(&self, name: &OsStr) -> Option<&Path> {
        self.by_name
            .get(name)
            .and_then(|candidates| candidates.first())
            .map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
