// SPDX-License-Identifier: GPL-3.0-or-later

//! Statistics collection for the merge of compilation databases.
//!
//! Every merge produces one `MergeStatistics` value. The merger runs on a
//! single thread, so the counters are plain integers.

use std::fmt;

/// Statistics collected during one merge.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MergeStatistics {
    /// Number of entries read from the build artifact.
    pub candidates_read: usize,

    /// Number of entries skipped because they could not be resolved to a source file.
    pub entries_unresolvable: usize,

    /// Number of entries discarded because their file is not part of the project.
    pub entries_outside_project: usize,

    /// Number of entries mapped from the build directory back to a project file.
    pub entries_retargeted: usize,

    /// Number of fresh entries merged into the database.
    pub fresh_entries: usize,

    /// Number of entries read from the previous database.
    pub previous_entries: usize,

    /// Number of previous entries kept untouched.
    pub previous_kept: usize,

    /// Number of previous entries dropped, as stale or duplicate.
    pub previous_pruned: usize,

    /// Total number of entries in the merged database.
    pub entries_written: usize,
}

impl fmt::Display for MergeStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Merge:")?;
        writeln!(f, "  candidate entries: {}", self.candidates_read)?;
        writeln!(f, "  unresolvable entries: {}", self.entries_unresolvable)?;
        writeln!(f, "  filtered entries by project: {}", self.entries_outside_project)?;
        writeln!(f, "  retargeted entries: {}", self.entries_retargeted)?;
        writeln!(f, "  fresh entries: {}", self.fresh_entries)?;
        writeln!(f, "  previous entries: {}", self.previous_entries)?;
        writeln!(f, "  previous entries kept: {}", self.previous_kept)?;
        writeln!(f, "  previous entries pruned: {}", self.previous_pruned)?;
        write!(f, "  total entries written: {}", self.entries_written)
    }
}
