// SPDX-License-Identifier: GPL-3.0-or-later

//! Reconstruction of compilation database entries from the incremental
//! build cache of the toolchain.
//!
//! When the toolchain did not emit a compilation database, its build cache
//! still records every compile task. The records are classified once when
//! read (`BuildCacheEntry`), and `reconstruct` maps them to `CompileEntry`
//! values without further inspection of the raw record.

use super::entry::CompileEntry;
use crate::sources;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Flags which only make sense for the build itself, not for an indexer.
const DROPPED_FLAGS: &[&str] = &["-c", "-E", "-CC", "-w", "-MMD", "-MD", "-MP"];
/// Flags which are dropped together with their value.
const DROPPED_FLAG_PAIRS: &[&str] = &["-MF", "-MT", "-MQ"];
const OUTPUT_FLAG: &str = "-o";

/// Sketch files, `sketchLocation` may name one instead of its directory.
const SKETCH_EXTENSIONS: &[&str] = &["ino", "pde"];

/// A compile task as the toolchain records it in the build cache.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CacheRecord {
    #[serde(default, alias = "compileTask")]
    pub compile_task: CompileTask,
    #[serde(default, alias = "compileInfo")]
    pub compile: CompileInfo,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CompileTask {
    #[serde(default, alias = "arguments")]
    pub args: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CompileInfo {
    #[serde(default, alias = "sourcePath")]
    pub source_path: Option<PathBuf>,
    #[serde(default, alias = "objectPath")]
    pub object_path: Option<PathBuf>,
}

/// A classified build cache record.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildCacheEntry {
    pub arguments: Vec<String>,
    pub source_path: Option<PathBuf>,
    pub object_path: Option<PathBuf>,
    /// The compile task wrote its object to a null device.
    pub no_object_output: bool,
}

impl BuildCacheEntry {
    /// Classifies the record, checking the `-o` target against the given
    /// null device names.
    pub fn classify<S: AsRef<str>>(record: CacheRecord, null_devices: &[S]) -> Self {
        let arguments = record.compile_task.args;
        let no_object_output = arguments
            .iter()
            .skip_while(|argument| argument.as_str() != OUTPUT_FLAG)
            .nth(1)
            .is_some_and(|target| null_devices.iter().any(|device| device.as_ref() == target));

        Self {
            arguments,
            source_path: record.compile.source_path,
            object_path: record.compile.object_path,
            no_object_output,
        }
    }

    /// The source file of the compile task.
    ///
    /// Falls back to the last argument which looks like a source file.
    pub fn source(&self) -> Option<PathBuf> {
        self.source_path.clone().or_else(|| {
            self.arguments
                .iter()
                .rev()
                .find(|argument| sources::looks_like_a_source_file(argument))
                .map(PathBuf::from)
        })
    }

    /// The argument list with the build-only flags removed and the output
    /// flag rewritten.
    pub fn rewritten_arguments(&self) -> Vec<String> {
        let mut result = Vec::with_capacity(self.arguments.len());
        let mut arguments = self.arguments.iter();
        while let Some(argument) = arguments.next() {
            let argument = argument.as_str();
            if DROPPED_FLAGS.contains(&argument) {
                continue;
            }
            if DROPPED_FLAG_PAIRS.contains(&argument) {
                arguments.next();
                continue;
            }
            if argument == OUTPUT_FLAG {
                let Some(target) = arguments.next() else {
                    continue;
                };
                match &self.object_path {
                    Some(object) => {
                        result.push(OUTPUT_FLAG.to_string());
                        result.push(object.to_string_lossy().into_owned());
                    }
                    None if self.no_object_output => {}
                    None => {
                        result.push(OUTPUT_FLAG.to_string());
                        result.push(target.clone());
                    }
                }
                continue;
            }
            result.push(argument.to_string());
        }
        result
    }
}

/// The build options side file of the toolchain.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    #[serde(default)]
    pub sketch_location: Option<PathBuf>,
}

impl BuildOptions {
    /// The directory relative source paths are resolved against.
    ///
    /// The sketch location wins over the given sketch directory. When it
    /// names a sketch file, its parent directory is used.
    pub fn base_directory(&self, sketch_dir: &Path) -> PathBuf {
        match &self.sketch_location {
            Some(location) if location.as_os_str().is_empty() => sketch_dir.to_path_buf(),
            Some(location) if is_sketch_file(location) => match location.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => sketch_dir.to_path_buf(),
            },
            Some(location) => location.clone(),
            None => sketch_dir.to_path_buf(),
        }
    }
}

fn is_sketch_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| SKETCH_EXTENSIONS.contains(&extension))
}

/// Maps the classified cache entries to compilation database entries.
///
/// Entries without a determinable source, or without arguments after the
/// rewrite, are skipped.
pub fn reconstruct(entries: &[BuildCacheEntry], base_directory: &Path) -> Vec<CompileEntry> {
    entries
        .iter()
        .filter_map(|entry| {
            let Some(source) = entry.source() else {
                log::debug!("Build cache entry without source file: {:?}", entry.arguments);
                return None;
            };
            let arguments = entry.rewritten_arguments();
            if arguments.is_empty() {
                log::debug!("Build cache entry without arguments: {}", source.display());
                return None;
            }
            Some(CompileEntry::from_arguments(base_directory, source, arguments))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NULL_DEVICES: &[&str] = &["/dev/null", "NUL", "nul"];

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn record(arguments: &[&str], source: Option<&str>, object: Option<&str>) -> CacheRecord {
        CacheRecord {
            compile_task: CompileTask { args: strings(arguments) },
            compile: CompileInfo {
                source_path: source.map(PathBuf::from),
                object_path: object.map(PathBuf::from),
            },
        }
    }

    #[test]
    fn test_reconstruct_drops_null_output() {
        let entry = BuildCacheEntry::classify(
            record(&["g++", "-c", "sketch.ino", "-o", "/dev/null"], Some("/proj/sketch.ino"), None),
            NULL_DEVICES,
        );
        assert!(entry.no_object_output);

        let result = reconstruct(&[entry], Path::new("/proj"));

        assert_eq!(result, vec![CompileEntry::from_arguments_str("/proj", "/proj/sketch.ino", vec!["g++", "sketch.ino"])]);
    }

    #[test]
    fn test_windows_null_device() {
        let entry = BuildCacheEntry::classify(record(&["g++", "main.c", "-o", "NUL"], None, None), NULL_DEVICES);

        assert!(entry.no_object_output);
        assert_eq!(entry.rewritten_arguments(), strings(&["g++", "main.c"]));
    }

    #[test]
    fn test_object_path_replaces_output() {
        let entry = BuildCacheEntry::classify(
            record(&["g++", "-c", "main.c", "-o", "/dev/null"], None, Some("/build/main.c.o")),
            NULL_DEVICES,
        );

        assert_eq!(entry.rewritten_arguments(), strings(&["g++", "main.c", "-o", "/build/main.c.o"]));
    }

    #[test]
    fn test_regular_output_is_kept() {
        let entry = BuildCacheEntry::classify(record(&["g++", "main.c", "-o", "main.o"], None, None), NULL_DEVICES);

        assert!(!entry.no_object_output);
        assert_eq!(entry.rewritten_arguments(), strings(&["g++", "main.c", "-o", "main.o"]));
    }

    #[test]
    fn test_dependency_flags_are_dropped() {
        let entry = BuildCacheEntry::classify(
            record(
                &["gcc", "-E", "-CC", "-w", "-MMD", "-MF", "main.d", "-MT", "main.o", "-DX", "main.c"],
                None,
                None,
            ),
            NULL_DEVICES,
        );

        assert_eq!(entry.rewritten_arguments(), strings(&["gcc", "-DX", "main.c"]));
    }

    #[test]
    fn test_source_from_arguments() {
        let entry = BuildCacheEntry::classify(
            record(&["g++", "-include", "Arduino.h", "core.cpp", "sketch.ino.cpp", "-o", "x.o"], None, None),
            NULL_DEVICES,
        );

        assert_eq!(entry.source(), Some(PathBuf::from("sketch.ino.cpp")));
    }

    #[test]
    fn test_entries_without_source_or_arguments_are_skipped() {
        let entries = [
            BuildCacheEntry::classify(record(&["g++", "-c"], None, None), NULL_DEVICES),
            BuildCacheEntry::classify(record(&["-c"], Some("/proj/a.c"), None), NULL_DEVICES),
            BuildCacheEntry::classify(record(&["gcc", "b.c"], None, None), NULL_DEVICES),
        ];

        let result = reconstruct(&entries, Path::new("/proj"));

        assert_eq!(result, vec![CompileEntry::from_arguments_str("/proj", "b.c", vec!["gcc", "b.c"])]);
    }

    #[test]
    fn test_record_schema() {
        let value = json!({
            "compile_task": { "args": ["g++", "main.c"], "id": 3 },
            "compile": { "source_path": "/proj/main.c" },
            "hash": "abc"
        });
        let camel = json!({
            "compileTask": { "arguments": ["g++", "main.c"] },
            "compileInfo": { "sourcePath": "/proj/main.c" }
        });

        let expected = record(&["g++", "main.c"], Some("/proj/main.c"), None);
        assert_eq!(serde_json::from_value::<CacheRecord>(value).unwrap(), expected);
        assert_eq!(serde_json::from_value::<CacheRecord>(camel).unwrap(), expected);
    }

    #[test]
    fn test_build_options_base_directory() {
        let sketch_dir = Path::new("/home/me/sketch");
        let cases = [
            (json!({}), "/home/me/sketch"),
            (json!({ "sketchLocation": "/work/blink" }), "/work/blink"),
            (json!({ "sketchLocation": "/work/blink/blink.ino", "fqbn": "avr:uno" }), "/work/blink"),
            (json!({ "sketchLocation": "" }), "/home/me/sketch"),
        ];
        for (value, expected) in cases {
            let options: BuildOptions = serde_json::from_value(value).unwrap();
            assert_eq!(options.base_directory(sketch_dir), PathBuf::from(expected));
        }
    }
}
