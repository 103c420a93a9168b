// SPDX-License-Identifier: GPL-3.0-or-later

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use serde_json::json;
use std::error::Error;

const BIN: &str = "compdb-sync";

/// A working directory with an explicit configuration file, so the user's
/// own configuration does not leak into the tests.
fn workspace() -> Result<TempDir, Box<dyn Error>> {
    let temp = TempDir::new()?;
    temp.child("compdb-sync.yml").write_str("schema: \"1.0\"\n")?;
    temp.child("sketch").create_dir_all()?;
    Ok(temp)
}

fn command(temp: &TempDir) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin(BIN)?;
    cmd.current_dir(temp.path()).env_remove("RUST_LOG").args(["-c", "compdb-sync.yml"]);
    Ok(cmd)
}

#[test]
fn test_help() -> Result<(), Box<dyn Error>> {
    Command::cargo_bin(BIN)?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: compdb-sync"));
    Ok(())
}

#[test]
fn test_empty_arguments() -> Result<(), Box<dyn Error>> {
    Command::cargo_bin(BIN)?.assert().failure().stderr(predicate::str::contains("Usage: compdb-sync"));
    Ok(())
}

#[test]
fn test_diagnostics_from_stdin() -> Result<(), Box<dyn Error>> {
    let temp = workspace()?;
    let stream = "sketch.ino:3:5: error: expected ';' before '}' token\n\
                  In file included from sketch.ino:1:\n\
                  sketch.ino:7:1: warning: unused variable 'x' [-Wunused-variable]\n";

    command(&temp)?
        .args(["diagnostics", "--input", "-", "--directory", "sketch", "--project", "sketch"])
        .write_stdin(stream)
        .assert()
        .success()
        .stdout(predicate::str::contains("sketch.ino"))
        .stdout(predicate::str::contains("\"severity\": \"error\""))
        .stdout(predicate::str::contains("\"code\": \"unused-variable\""))
        .stdout(predicate::str::contains("In file included").not());
    Ok(())
}

#[test]
fn test_diagnostics_outside_project_are_hidden() -> Result<(), Box<dyn Error>> {
    let temp = workspace()?;

    command(&temp)?
        .args(["diagnostics", "--directory", "sketch", "--project", "sketch"])
        .write_stdin("../core/wiring.c:10:1: error: expected ';'\n")
        .assert()
        .success()
        .stdout(predicate::str::diff("{}\n"));

    command(&temp)?
        .args(["diagnostics", "--directory", "sketch", "--project", "sketch", "--allow-outside"])
        .write_stdin("../core/wiring.c:10:1: error: expected ';'\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("wiring.c"));
    Ok(())
}

#[test]
fn test_diagnostics_missing_input_file() -> Result<(), Box<dyn Error>> {
    let temp = workspace()?;

    command(&temp)?
        .args(["diagnostics", "--input", "missing.txt", "--directory", "sketch", "--project", "sketch"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn test_merge_without_artifact() -> Result<(), Box<dyn Error>> {
    let temp = workspace()?;
    temp.child("build").create_dir_all()?;

    command(&temp)?
        .args(["merge", "--build-dir", "build", "--project", "sketch"])
        .assert()
        .success()
        .stdout(predicate::str::diff("-1\n"));

    temp.child("sketch/.vscode/compile_commands.json").assert(predicate::path::missing());
    Ok(())
}

#[test]
fn test_merge_missing_project() -> Result<(), Box<dyn Error>> {
    let temp = workspace()?;

    command(&temp)?
        .args(["merge", "--build-dir", "build", "--project", "missing"])
        .assert()
        .failure();
    Ok(())
}

#[test]
#[cfg(unix)]
fn test_merge_compilation_database() -> Result<(), Box<dyn Error>> {
    let temp = workspace()?;
    let source = temp.child("sketch/src/util.cpp");
    source.write_str("int util() { return 1; }\n")?;
    let outside = temp.child("core/wiring.c");
    outside.write_str("void init() {}\n")?;

    let build = temp.child("build");
    build.create_dir_all()?;
    let database = json!([
        {
            "directory": build.path(),
            "file": source.path(),
            "arguments": ["g++", "-c", source.path(), "-o", "util.cpp.o"]
        },
        {
            "directory": build.path(),
            "file": outside.path(),
            "arguments": ["gcc", "-c", outside.path(), "-o", "wiring.c.o"]
        }
    ]);
    build.child("compile_commands.json").write_str(&database.to_string())?;

    command(&temp)?
        .args(["merge", "--build-dir", "build", "--project", "sketch"])
        .assert()
        .success()
        .stdout(predicate::str::diff("1\n"));

    let output = temp.child("sketch/.vscode/compile_commands.json");
    output.assert(predicate::path::is_file());
    output.assert(predicate::str::contains("util.cpp"));
    output.assert(predicate::str::contains("Arduino.h"));
    output.assert(predicate::str::contains("wiring.c").not());

    // Merging the same build again keeps a single entry.
    command(&temp)?
        .args(["merge", "--build-dir", "build", "--project", "sketch"])
        .assert()
        .success()
        .stdout(predicate::str::diff("1\n"));

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(output.path())?)?;
    assert_eq!(written.as_array().map(Vec::len), Some(1));
    Ok(())
}
