// SPDX-License-Identifier: GPL-3.0-or-later

//! Extraction of diagnostics from the captured error stream of a build.
//!
//! The extractor is a line classifier: every line either matches the GCC
//! diagnostic format `<path>:<line>[:<column>]: <severity>: <message>`, or
//! is ignored. Include chain lines (`In file included from ...` and the
//! `from ...` continuation lines) are context, never diagnostics.

use super::types::{Diagnostic, DiagnosticReport, Severity};
use crate::config;
use crate::paths;
use crate::project::ProjectBoundary;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static DIAGNOSTIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<path>.+?):(?:(?P<line>[^:\s/\\]+):)?(?:(?P<column>[^:\s/\\]+):)?\s*(?P<severity>fatal error|error|warning|note):\s*(?P<message>.*)$",
    )
    .expect("Invalid diagnostic regex pattern")
});

static CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[-W([^\]\s]+)\]\s*$").expect("Invalid diagnostic code regex pattern"));

const INCLUDE_CONTEXT_PREFIXES: &[&str] = &["In file included from", "from "];

/// Which diagnostics of files outside the project are reported.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibilityPolicy {
    /// Report diagnostics of files outside the project at all.
    pub allow_outside: bool,
    /// Drop the warnings of files outside the project, even if allowed.
    pub skip_warnings_outside_project: bool,
}

impl From<&config::Diagnostics> for VisibilityPolicy {
    fn from(config: &config::Diagnostics) -> Self {
        Self {
            allow_outside: config.allow_outside_diagnostics,
            skip_warnings_outside_project: config.skip_warnings_outside_project,
        }
    }
}

impl VisibilityPolicy {
    /// Decides whether the diagnostic is reported.
    pub fn is_visible(&self, boundary: &ProjectBoundary, diagnostic: &Diagnostic) -> bool {
        if boundary.contains(&diagnostic.file) {
            return true;
        }
        if !self.allow_outside {
            return false;
        }
        diagnostic.severity.is_error() || !self.skip_warnings_outside_project
    }
}

/// Extracts the diagnostics of the project from compiler output.
pub struct DiagnosticExtractor<'a> {
    boundary: &'a ProjectBoundary,
    policy: VisibilityPolicy,
}

impl<'a> DiagnosticExtractor<'a> {
    pub fn new(boundary: &'a ProjectBoundary, policy: VisibilityPolicy) -> Self {
        Self { boundary, policy }
    }

    /// Extracts the visible diagnostics of the text.
    ///
    /// Relative paths are resolved against the `working_directory` of the
    /// build. The result depends on the arguments only.
    pub fn extract(&self, text: &str, working_directory: &Path) -> DiagnosticReport {
        let mut report = DiagnosticReport::default();
        let mut hidden = 0_usize;

        for diagnostic in text.split(['\n', '\r']).filter_map(|line| parse_line(line, working_directory)) {
            if self.policy.is_visible(self.boundary, &diagnostic) {
                report.push(diagnostic);
            } else {
                log::trace!("Diagnostic is hidden by the visibility policy: {diagnostic}");
                hidden += 1;
            }
        }

        log::debug!(
            "Diagnostics extracted: {} files, {} errors, {} warnings, {} hidden",
            report.file_count(),
            report.error_count(),
            report.warning_count(),
            hidden
        );
        report
    }
}

/// Parses a single line of compiler output.
///
/// Returns `None` for lines which are not diagnostics, for include chain
/// context lines, for notes, and for lines with an invalid path.
pub fn parse_line(line: &str, working_directory: &Path) -> Option<Diagnostic> {
    if is_include_context(line) {
        return None;
    }
    let captures = DIAGNOSTIC_PATTERN.captures(line)?;

    let severity = match &captures["severity"] {
        "fatal error" | "error" => Severity::Error,
        "warning" => Severity::Warning,
        _ => return None,
    };
    let file = resolve_path(captures["path"].trim(), working_directory)?;
    let message = captures["message"].trim_end().to_string();
    let code = CODE_PATTERN.captures(&message).map(|code| {
        let option = &code[1];
        option.strip_prefix("error=").unwrap_or(option).to_string()
    });

    Some(Diagnostic {
        file,
        severity,
        message,
        line: position(captures.name("line").map(|value| value.as_str())),
        column: position(captures.name("column").map(|value| value.as_str())),
        code,
    })
}

fn is_include_context(line: &str) -> bool {
    let line = line.trim_start();
    INCLUDE_CONTEXT_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

fn resolve_path(value: &str, working_directory: &Path) -> Option<PathBuf> {
    if value.is_empty() || paths::is_bare_drive(value) {
        log::debug!("Diagnostic with invalid path: {value:?}");
        return None;
    }
    Some(paths::resolve(working_directory, Path::new(value)))
}

/// Parses a 1-based position, defaulting to the first.
fn position(value: Option<&str>) -> u32 {
    value.and_then(|value| value.parse::<u32>().ok()).unwrap_or(1).max(1)
}
