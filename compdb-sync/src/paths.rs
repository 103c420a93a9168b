// SPDX-License-Identifier: GPL-3.0-or-later

//! Lexical path helpers shared by the diagnostic extractor and the merger.
//!
//! Toolchain output mixes host-native and Windows-style paths. The helpers
//! here treat drive-letter paths as absolute on every host and never touch
//! the filesystem: no canonicalization, no symlink resolution.

use std::path::{Component, Path, PathBuf};

/// Checks if the value is a bare drive designator, like `C:` (or the `C`
/// left over when a diagnostic prefix is split on its colon).
pub fn is_bare_drive(value: &str) -> bool {
    matches!(value.as_bytes(), [letter] | [letter, b':'] if letter.is_ascii_alphabetic())
}

/// Checks if the path is absolute on the host, or is a Windows drive-letter
/// path (`C:\src`, `C:/src`) on any host.
pub fn is_absolute(path: &Path) -> bool {
    path.is_absolute() || has_drive_prefix(&path.to_string_lossy())
}

fn has_drive_prefix(value: &str) -> bool {
    matches!(value.as_bytes(), [letter, b':', b'\\' | b'/', ..] if letter.is_ascii_alphabetic())
}

/// Resolves `path` against `base` unless it is already absolute. The result
/// is normalized lexically.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if is_absolute(path) {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Removes `.` components and folds `..` into the preceding component.
///
/// A `..` directly under the root is dropped; leading `..` components of a
/// relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match result.components().next_back() {
                Some(Component::Normal(_)) => {
                    result.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => result.push(component.as_os_str()),
            },
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Checks if `path` lies under `root`, after normalizing both.
pub fn is_within(path: &Path, root: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_drive() {
        assert!(is_bare_drive("C:"));
        assert!(is_bare_drive("d"));
        assert!(!is_bare_drive("C:\\src"));
        assert!(!is_bare_drive("main.c"));
        assert!(!is_bare_drive("1:"));
        assert!(!is_bare_drive(""));
    }

    #[test]
    fn test_absolute_paths() {
        assert!(is_absolute(Path::new("C:\\Users\\me\\sketch.ino")));
        assert!(is_absolute(Path::new("c:/Users/me/sketch.ino")));
        assert!(!is_absolute(Path::new("C:relative")));
        assert!(!is_absolute(Path::new("src/main.c")));
        #[cfg(unix)]
        assert!(is_absolute(Path::new("/src/main.c")));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("../a/./b")), PathBuf::from("../a/b"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve() {
        assert_eq!(resolve(Path::new("/build"), Path::new("../src/main.c")), PathBuf::from("/src/main.c"));
        assert_eq!(resolve(Path::new("/build"), Path::new("/opt/x.c")), PathBuf::from("/opt/x.c"));
        assert_eq!(resolve(Path::new("/build"), Path::new("C:\\x.c")), PathBuf::from("C:\\x.c"));
    }

    #[test]
    #[cfg(unix)]
    fn test_is_within() {
        assert!(is_within(Path::new("/project/src/../main.c"), Path::new("/project")));
        assert!(!is_within(Path::new("/project-other/main.c"), Path::new("/project")));
        assert!(!is_within(Path::new("/project/../other/main.c"), Path::new("/project")));
    }
}
