// SPDX-License-Identifier: GPL-3.0-or-later

//! Problem list extraction from the compiler's error stream.

mod extract;
mod types;

pub use extract::{parse_line, DiagnosticExtractor, VisibilityPolicy};
pub use types::{Diagnostic, DiagnosticReport, Severity};
