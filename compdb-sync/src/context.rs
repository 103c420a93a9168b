// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Context as AnyhowContext, Result};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// Application context containing runtime environment information.
///
/// Captured once at startup, so the configuration and argument handling
/// phases need no further I/O.
#[derive(Debug, Clone)]
pub struct Context {
    /// Path to the current executable
    pub current_executable: PathBuf,
    /// Current working directory when the application was invoked
    pub current_directory: PathBuf,
}

impl Context {
    /// Capture the current application context.
    pub fn capture() -> Result<Self> {
        let current_executable = env::current_exe().with_context(|| "Failed to get current executable path")?;

        let current_directory = env::current_dir().with_context(|| "Failed to get current working directory")?;

        Ok(Context { current_executable, current_directory })
    }

    /// Resolves a command line path against the current working directory.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        crate::paths::resolve(&self.current_directory, path)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Application Context:")?;
        writeln!(f, "Current Executable: {}", self.current_executable.display())?;
        write!(f, "Current Directory: {}", self.current_directory.display())
    }
}
