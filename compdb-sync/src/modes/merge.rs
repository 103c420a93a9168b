// SPDX-License-Identifier: GPL-3.0-or-later

use crate::arguments::Normalizer;
use crate::config;
use crate::database::{FileStorage, MergeRequest, Merger};
use crate::project::{FileIndex, ProjectBoundary};
use anyhow::Context;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Merges the build output and prints the merge count on the standard output.
pub struct MergeRun {
    build_dir: PathBuf,
    project_dir: PathBuf,
    boundary: ProjectBoundary,
    database: PathBuf,
    config: config::Main,
}

impl MergeRun {
    pub(super) fn new(
        build_dir: PathBuf,
        project_dir: PathBuf,
        boundary: ProjectBoundary,
        database: PathBuf,
        config: config::Main,
    ) -> Self {
        Self { build_dir, project_dir, boundary, database, config }
    }

    pub(super) fn run(self) -> anyhow::Result<ExitCode> {
        let files = FileIndex::scan(&self.boundary, std::slice::from_ref(&self.build_dir));
        let storage = FileStorage;
        let normalizer = Normalizer::new(self.config.arguments.implicit_header.clone(), &storage);
        let merger = Merger::new(&storage, normalizer, &self.config.artifacts);

        let request = MergeRequest {
            build_dir: &self.build_dir,
            sketch_dir: &self.project_dir,
            project: &self.boundary,
            files: &files,
            database: &self.database,
        };
        let report = merger.merge(&request)?;
        log::info!("{}", report.statistics);

        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", report.outcome.count()).with_context(|| "Failed to write merge count")?;

        Ok(ExitCode::SUCCESS)
    }

    #[cfg(test)]
    pub(super) fn database(&self) -> &std::path::Path {
        &self.database
    }

    #[cfg(test)]
    pub(super) fn build_dir(&self) -> &std::path::Path {
        &self.build_dir
    }
}
