// SPDX-License-Identifier: GPL-3.0-or-later

pub mod args;
pub mod arguments;
pub mod config;
pub mod context;
pub mod database;
pub mod diagnostics;
pub mod modes;
pub mod paths;
pub mod project;
pub mod sources;
