// SPDX-License-Identifier: GPL-3.0-or-later

//! Diagnostic records and the per-file report built from them.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The severity of a reported diagnostic.
///
/// Fatal errors are reported as errors, notes are not reported at all.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single diagnostic of the compiler output.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    /// The absolute path of the file, the key of the report.
    #[serde(skip)]
    pub file: PathBuf,
    pub severity: Severity,
    pub message: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// The warning option which enabled the diagnostic, without the `-W`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file.display(),
            self.line,
            self.column,
            self.severity,
            self.message
        )
    }
}

/// Diagnostics grouped by file, in the order the files were first seen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiagnosticReport {
    files: Vec<(PathBuf, Vec<Diagnostic>)>,
    index: HashMap<PathBuf, usize>,
}

impl DiagnosticReport {
    /// Appends the diagnostic to the list of its file.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match self.index.get(&diagnostic.file) {
            Some(&position) => self.files[position].1.push(diagnostic),
            None => {
                self.index.insert(diagnostic.file.clone(), self.files.len());
                self.files.push((diagnostic.file.clone(), vec![diagnostic]));
            }
        }
    }

    /// Per-file diagnostics, in first-seen order.
    pub fn files(&self) -> &[(PathBuf, Vec<Diagnostic>)] {
        &self.files
    }

    /// The diagnostics of the given file.
    pub fn get(&self, file: &Path) -> Option<&[Diagnostic]> {
        self.index.get(file).map(|&position| self.files[position].1.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn diagnostic_count(&self) -> usize {
        self.files.iter().map(|(_, items)| items.len()).sum()
    }

    pub fn error_count(&self) -> usize {
        self.count_by_severity(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count_by_severity(Severity::Warning)
    }

    fn count_by_severity(&self, severity: Severity) -> usize {
        self.files
            .iter()
            .flat_map(|(_, items)| items)
            .filter(|diagnostic| diagnostic.severity == severity)
            .count()
    }
}

impl Serialize for DiagnosticReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.files.len()))?;
        for (file, diagnostics) in &self.files {
            map.serialize_entry(file, diagnostics)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_diagnostic(file: &str, severity: Severity, line: u32) -> Diagnostic {
        Diagnostic {
            file: PathBuf::from(file),
            severity,
            message: format!("problem at {line}"),
            line,
            column: 1,
            code: None,
        }
    }

    #[test]
    fn test_report_keeps_first_seen_order() {
        let mut report = DiagnosticReport::default();
        report.push(make_diagnostic("/b.c", Severity::Warning, 1));
        report.push(make_diagnostic("/a.c", Severity::Error, 2));
        report.push(make_diagnostic("/b.c", Severity::Error, 3));

        let files: Vec<_> = report.files().iter().map(|(file, _)| file.clone()).collect();
        assert_eq!(files, vec![PathBuf::from("/b.c"), PathBuf::from("/a.c")]);
        assert_eq!(report.get(Path::new("/b.c")).map(<[Diagnostic]>::len), Some(2));
        assert_eq!(report.file_count(), 2);
        assert_eq!(report.diagnostic_count(), 3);
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_empty_report() {
        let report = DiagnosticReport::default();

        assert!(report.is_empty());
        assert_eq!(report.diagnostic_count(), 0);
        assert_eq!(serde_json::to_value(&report).unwrap(), json!({}));
    }

    #[test]
    fn test_serialize_report() {
        let mut report = DiagnosticReport::default();
        let mut diagnostic = make_diagnostic("/src/main.cpp", Severity::Warning, 7);
        diagnostic.code = Some(String::from("unused-variable"));
        report.push(diagnostic);

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "/src/main.cpp": [{
                    "severity": "warning",
                    "message": "problem at 7",
                    "line": 7,
                    "column": 1,
                    "code": "unused-variable"
                }]
            })
        );
    }

    #[test]
    fn test_display() {
        let diagnostic = make_diagnostic("/src/main.cpp", Severity::Error, 4);

        assert_eq!(diagnostic.to_string(), "/src/main.cpp:4:1: error: problem at 4");
    }
}
