// SPDX-License-Identifier: GPL-3.0-or-later

//! Normalization of compiler invocations into the canonical token list.
//!
//! The steps, applied in order:
//!
//! 1. `@file` response files are replaced by their (recursively expanded)
//!    content.
//! 2. `-iprefix <PATH>` followed by `-iwithprefixbefore <SUFFIX>` flags is
//!    rewritten into `-I<PATH/SUFFIX>` flags.
//! 3. The implicit header is injected with `-include` after the executable,
//!    unless the invocation already includes it.
//!
//! Every step builds a new list from the old one. Normalizing an already
//! normalized list returns it unchanged.

use super::tokenize;
use crate::database::storage::Storage;
use crate::paths;
use std::path::{Path, PathBuf};

const IPREFIX_FLAG: &str = "-iprefix";
const IWITHPREFIXBEFORE_FLAG: &str = "-iwithprefixbefore";
const INCLUDE_FLAG: &str = "-include";

/// Response files nested deeper than this are dropped.
const MAX_RESPONSE_FILE_DEPTH: usize = 8;

/// The two ways a compilation database entry can carry its invocation.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Invocation {
    /// Already split argument list, `arguments[0]` is the executable.
    Arguments(Vec<String>),
    /// Single shell-quoted command string.
    Command(String),
}

impl Invocation {
    /// Returns the argument tokens, splitting the command string if needed.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            Invocation::Arguments(arguments) => arguments.clone(),
            Invocation::Command(command) => tokenize::split(command),
        }
    }

    /// Creates an invocation of the same form with the given tokens.
    pub fn with_tokens(&self, tokens: Vec<String>) -> Self {
        match self {
            Invocation::Arguments(_) => Invocation::Arguments(tokens),
            Invocation::Command(_) => Invocation::Command(tokenize::join(&tokens)),
        }
    }
}

/// The result of the normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedArguments {
    /// The fully expanded, normalized token list.
    pub arguments: Vec<String>,
    /// The re-serialized command, when the input was a command string.
    pub command: Option<String>,
}

impl NormalizedArguments {
    /// Converts back into an invocation of the original form.
    pub fn into_invocation(self) -> Invocation {
        match self.command {
            Some(command) => Invocation::Command(command),
            None => Invocation::Arguments(self.arguments),
        }
    }
}

/// Normalizes compiler invocations.
pub struct Normalizer<'a> {
    implicit_header: Option<String>,
    storage: &'a dyn Storage,
}

impl<'a> Normalizer<'a> {
    /// Creates a normalizer.
    ///
    /// The `implicit_header` is the header every translation unit must
    /// include (`None` disables the injection). Response files are read
    /// through the `storage`.
    pub fn new(implicit_header: Option<String>, storage: &'a dyn Storage) -> Self {
        Self { implicit_header, storage }
    }

    /// Normalizes the invocation. Relative response file references are
    /// resolved against the `directory`.
    pub fn normalize(&self, invocation: &Invocation, directory: &Path) -> NormalizedArguments {
        let tokens = invocation.tokens();
        let tokens = self.expand_response_files(tokens, directory, &mut Vec::new());
        let tokens = rewrite_prefix_flags(tokens);
        let arguments = match &self.implicit_header {
            Some(header) => inject_implicit_header(tokens, header),
            None => tokens,
        };

        let command = match invocation {
            Invocation::Command(_) => Some(tokenize::join(&arguments)),
            Invocation::Arguments(_) => None,
        };
        NormalizedArguments { arguments, command }
    }

    fn expand_response_files(&self, tokens: Vec<String>, directory: &Path, visiting: &mut Vec<PathBuf>) -> Vec<String> {
        let mut result = Vec::with_capacity(tokens.len());
        for token in tokens {
            let Some(name) = token.strip_prefix('@').filter(|name| !name.is_empty()) else {
                result.push(token);
                continue;
            };
            let path = paths::resolve(directory, Path::new(name));
            match self.read_response_file(&path, visiting) {
                ResponseFile::Content(content) => {
                    visiting.push(path);
                    let expanded = self.expand_response_files(tokenize::split(&content), directory, visiting);
                    visiting.pop();
                    result.extend(expanded);
                }
                ResponseFile::Unavailable => result.push(token),
                ResponseFile::Rejected => {}
            }
        }
        result
    }

    fn read_response_file(&self, path: &Path, visiting: &[PathBuf]) -> ResponseFile {
        if visiting.len() >= MAX_RESPONSE_FILE_DEPTH || visiting.iter().any(|seen| seen == path) {
            log::warn!("Response file is nested too deep or recursive: {}", path.display());
            return ResponseFile::Rejected;
        }
        match self.storage.read(path) {
            Ok(Some(content)) => ResponseFile::Content(String::from_utf8_lossy(&content).into_owned()),
            Ok(None) => {
                log::warn!("Response file not found: {}", path.display());
                ResponseFile::Unavailable
            }
            Err(error) => {
                log::warn!("{error}");
                ResponseFile::Unavailable
            }
        }
    }
}

/// The outcome of reading a response file reference.
enum ResponseFile {
    Content(String),
    /// Missing or unreadable, the reference is kept.
    Unavailable,
    /// Cyclic or nested too deep, the reference is dropped.
    Rejected,
}

/// The value part of a flag that may be given separately, fused, or with `=`.
enum FlagValue {
    Separate,
    Attached(String),
}

fn match_flag(token: &str, flag: &str) -> Option<FlagValue> {
    let rest = token.strip_prefix(flag)?;
    if rest.is_empty() {
        Some(FlagValue::Separate)
    } else {
        Some(FlagValue::Attached(rest.strip_prefix('=').unwrap_or(rest).to_string()))
    }
}

fn take_value(value: FlagValue, tokens: &mut impl Iterator<Item = String>) -> Option<String> {
    match value {
        FlagValue::Attached(value) => Some(value),
        FlagValue::Separate => tokens.next(),
    }
}

/// Rewrites `-iprefix` scoped `-iwithprefixbefore` flags into `-I` flags.
///
/// The `-iprefix` applies to the `-iwithprefixbefore` flags directly
/// following it; the first other token ends its scope. The `-iprefix`
/// itself is removed. A `-iwithprefixbefore` outside of a scope is kept.
pub fn rewrite_prefix_flags(tokens: Vec<String>) -> Vec<String> {
    let mut result = Vec::with_capacity(tokens.len());
    let mut tokens = tokens.into_iter().peekable();

    while let Some(token) = tokens.next() {
        let Some(flag) = match_flag(&token, IPREFIX_FLAG) else {
            result.push(token);
            continue;
        };
        let Some(prefix) = take_value(flag, &mut tokens) else {
            break;
        };
        while let Some(flag) = tokens.peek().and_then(|next| match_flag(next, IWITHPREFIXBEFORE_FLAG)) {
            tokens.next();
            if let Some(suffix) = take_value(flag, &mut tokens) {
                result.push(format!("-I{}", join_prefix(&prefix, &suffix)));
            }
        }
    }
    result
}

/// Joins the prefix and suffix with the separator style of the prefix.
fn join_prefix(prefix: &str, suffix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with(['/', '\\']) {
        return format!("{prefix}{suffix}");
    }
    let separator = if prefix.contains('\\') && !prefix.contains('/') { '\\' } else { '/' };
    format!("{prefix}{separator}{suffix}")
}

/// Inserts `-include <header>` after the executable, unless present.
pub fn inject_implicit_header(tokens: Vec<String>, header: &str) -> Vec<String> {
    if tokens.is_empty() || includes_header(&tokens, header) {
        return tokens;
    }
    let mut result = Vec::with_capacity(tokens.len() + 2);
    let mut tokens = tokens.into_iter();
    result.extend(tokens.next());
    result.push(INCLUDE_FLAG.to_string());
    result.push(header.to_string());
    result.extend(tokens);
    result
}

fn includes_header(tokens: &[String], header: &str) -> bool {
    let names_header = |value: &str| {
        value == header || Path::new(value).file_name().is_some_and(|name| name == header)
    };
    tokens.iter().enumerate().any(|(index, token)| match match_flag(token, INCLUDE_FLAG) {
        Some(FlagValue::Separate) => tokens.get(index + 1).is_some_and(|value| names_header(value)),
        Some(FlagValue::Attached(value)) => names_header(&value),
        None => false,
    })
}
