// SPDX-License-Identifier: GPL-3.0-or-later

//! Implements deserialization of the `CompileEntry` struct.
//!
//! Exactly one of `command` or `arguments` must be present. Fields the
//! format does not define are skipped, since toolchains tend to add their
//! own.

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use std::fmt;
use std::path::PathBuf;

use super::CompileEntry;
use crate::arguments::Invocation;

impl<'de> Deserialize<'de> for CompileEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_struct("CompileEntry", FIELDS, EntryVisitor)
    }
}

enum Field {
    Directory,
    File,
    Command,
    Arguments,
    Output,
    Other,
}

const FIELDS: &[&str] = &["directory", "file", "command", "arguments", "output"];

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D>(deserializer: D) -> Result<Field, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_identifier(FieldVisitor)
    }
}

struct FieldVisitor;

impl Visitor<'_> for FieldVisitor {
    type Value = Field;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "one of {:?}", FIELDS)
    }

    fn visit_str<E>(self, value: &str) -> Result<Field, E>
    where
        E: de::Error,
    {
        match value {
            "directory" => Ok(Field::Directory),
            "file" => Ok(Field::File),
            "command" => Ok(Field::Command),
            "arguments" => Ok(Field::Arguments),
            "output" => Ok(Field::Output),
            _ => Ok(Field::Other),
        }
    }
}

struct EntryVisitor;

impl<'de> Visitor<'de> for EntryVisitor {
    type Value = CompileEntry;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("object CompileEntry")
    }

    fn visit_map<V>(self, mut map: V) -> Result<CompileEntry, V::Error>
    where
        V: MapAccess<'de>,
    {
        let mut directory_opt: Option<PathBuf> = None;
        let mut file_opt: Option<PathBuf> = None;
        let mut command_opt: Option<String> = None;
        let mut arguments_opt: Option<Vec<String>> = None;
        let mut output: Option<PathBuf> = None;

        while let Some(key) = map.next_key()? {
            match key {
                Field::Directory => directory_opt = Some(map.next_value()?),
                Field::File => file_opt = Some(map.next_value()?),
                Field::Command => command_opt = Some(map.next_value()?),
                Field::Arguments => arguments_opt = Some(map.next_value()?),
                Field::Output => output = map.next_value()?,
                Field::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        let invocation = match (arguments_opt, command_opt) {
            (None, None) => Err(de::Error::missing_field("`command` or `arguments`")),
            (Some(_), Some(_)) => Err(de::Error::custom(
                "Either `command` or `arguments` field need to be specified, but not both.",
            )),
            (Some(arguments), None) => Ok(Invocation::Arguments(arguments)),
            (None, Some(command)) => Ok(Invocation::Command(command)),
        }?;

        Ok(CompileEntry {
            directory: directory_opt.ok_or_else(|| de::Error::missing_field("directory"))?,
            file: file_opt.ok_or_else(|| de::Error::missing_field("file"))?,
            invocation,
            output,
        })
    }
}
