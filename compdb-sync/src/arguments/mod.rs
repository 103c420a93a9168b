// SPDX-License-Identifier: GPL-3.0-or-later

//! Compiler argument handling: tokenizing command strings and normalizing
//! invocations into the canonical form stored in the compilation database.

mod normalize;
mod tokenize;

pub use normalize::{inject_implicit_header, rewrite_prefix_flags, Invocation, NormalizedArguments, Normalizer};
pub use tokenize::{join, split};
