// SPDX-License-Identifier: GPL-3.0-or-later

use crate::diagnostics::{DiagnosticExtractor, DiagnosticReport, VisibilityPolicy};
use crate::project::ProjectBoundary;
use anyhow::Context;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Where the captured error stream is read from.
#[derive(Debug)]
pub(super) enum Input {
    Stdin,
    File(PathBuf),
}

/// Extracts the problem list and prints it as JSON on the standard output.
pub struct DiagnosticsRun {
    input: Input,
    working_directory: PathBuf,
    boundary: ProjectBoundary,
    policy: VisibilityPolicy,
}

impl DiagnosticsRun {
    pub(super) fn new(
        input: Input,
        working_directory: PathBuf,
        boundary: ProjectBoundary,
        policy: VisibilityPolicy,
    ) -> Self {
        Self { input, working_directory, boundary, policy }
    }

    pub(super) fn run(self) -> anyhow::Result<ExitCode> {
        let text = self.read_input()?;
        let report = self.extract(&text);
        log::info!(
            "Diagnostics: {} errors and {} warnings in {} files",
            report.error_count(),
            report.warning_count(),
            report.file_count()
        );

        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &report).with_context(|| "Failed to write diagnostics")?;
        writeln!(stdout).with_context(|| "Failed to write diagnostics")?;

        Ok(ExitCode::SUCCESS)
    }

    /// The compiler output is not guaranteed to be valid UTF-8.
    fn read_input(&self) -> anyhow::Result<String> {
        let mut content = Vec::new();
        match &self.input {
            Input::Stdin => {
                io::stdin().lock().read_to_end(&mut content).with_context(|| "Failed to read standard input")?;
            }
            Input::File(path) => {
                content = std::fs::read(path)
                    .with_context(|| format!("Failed to read error stream: {}", path.display()))?;
            }
        }
        Ok(String::from_utf8_lossy(&content).into_owned())
    }

    fn extract(&self, text: &str) -> DiagnosticReport {
        DiagnosticExtractor::new(&self.boundary, self.policy).extract(text, &self.working_directory)
    }

    #[cfg(test)]
    pub(super) fn policy(&self) -> VisibilityPolicy {
        self.policy
    }

    #[cfg(test)]
    pub(super) fn working_directory(&self) -> &std::path::Path {
        &self.working_directory
    }
}
