// SPDX-License-Identifier: GPL-3.0-or-later

//! Recognition of translation-unit source files by their extension.
//!
//! The set is the one the embedded toolchain compiles: sketches (`.ino`
//! and their `.ino.cpp` translations), C, C++, Objective-C and assembly.
//! Header files are not translation units and are not recognized.

use std::collections::HashSet;
use std::path::Path;

/// Checks if a command line argument names a source file.
pub fn looks_like_a_source_file(argument: &str) -> bool {
    // not a command line flag
    if argument.starts_with('-') || argument.starts_with('@') {
        return false;
    }
    has_source_extension(argument)
}

/// Checks if the path names a source file.
pub fn is_source_path(path: &Path) -> bool {
    path.file_name()
        .map(|name| has_source_extension(&name.to_string_lossy()))
        .unwrap_or(false)
}

fn has_source_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => SOURCE_EXTENSIONS.contains(extension),
        _ => false,
    }
}

/// The sketch translation suffix the toolchain appends to `name.ino`.
pub const SKETCH_TRANSLATION_SUFFIX: &str = ".ino.cpp";

#[rustfmt::skip]
static SOURCE_EXTENSIONS: std::sync::LazyLock<HashSet<&'static str>> = std::sync::LazyLock::new(|| {
    HashSet::from([
        // sketches
        "ino",
        // C
        "c",
        // C++ (covers the `.ino.cpp` translation)
        "cc", "cpp", "cxx",
        // Objective-C
        "m", "mm",
        // Assembly
        "s", "sx", "S",
    ])
});
