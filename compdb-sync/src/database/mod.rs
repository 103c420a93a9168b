// SPDX-License-Identifier: GPL-3.0-or-later

//! The compilation database side of the engine.
//!
//! The build output directory is read through `artifact`, falling back to
//! the build cache (`cache`) when the toolchain did not write a compilation
//! database. The `merge` module folds the result into the consolidated
//! database the IDE reads. All file access goes through `storage`.

pub mod artifact;
pub mod cache;
pub mod entry;
pub mod format;
pub mod merge;
pub mod statistics;
pub mod storage;

pub use entry::{CompileEntry, EntryError};
pub use merge::{MergeError, MergeOutcome, MergeReport, MergeRequest, Merger};
pub use statistics::MergeStatistics;
pub use storage::{FileStorage, Storage, StorageError};
