//! Command dispatch tests: exit codes and files written by the CLI commands

use std::fs;

use clap::Parser;
use tempfile::TempDir;

use pdxmerge::cli::{execute_command, Cli};
use pdxmerge::exitcode;
use pdxmerge::util::testing;

fn run(args: &[&str]) -> Result<i32, pdxmerge::cli::CliError> {
    testing::init_test_setup();
    let cli = Cli::try_parse_from(std::iter::once("pdxmerge").chain(args.iter().copied()))
        .expect("valid arguments");
    execute_command(&cli)
}

#[test]
fn given_mod_directory_when_merge_command_then_writes_output() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let mods = temp.path().join("mods");
    fs::create_dir_all(mods.join("D")).unwrap();
    fs::write(mods.join("D/file1.txt"), "@cost = 5\na = { x = 1 }\n").unwrap();
    fs::write(mods.join("D/file2.txt"), "b = { y = 2 }\n").unwrap();
    let out = temp.path().join("merged.txt");

    // Act
    let code = run(&[
        "merge",
        mods.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--emit-defines",
    ])
    .unwrap();

    // Assert
    assert_eq!(code, exitcode::OK);
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "@cost = 5\na = {\n\tx = 1\n\ty = 2\n}\n"
    );
}

#[test]
fn given_clean_directory_when_check_command_then_ok() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.txt"), "a = { b = 1 }\n").unwrap();

    let code = run(&["check", temp.path().to_str().unwrap()]).unwrap();

    assert_eq!(code, exitcode::OK);
}

#[test]
fn given_skipped_lines_when_check_command_then_dataerr() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.txt"), "a = 1\n= = =\n").unwrap();

    let code = run(&["check", temp.path().to_str().unwrap()]).unwrap();

    assert_eq!(code, exitcode::DATAERR);
}

#[test]
fn given_missing_directory_when_files_command_then_noinput() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing");

    let err = run(&["files", missing.to_str().unwrap()]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::NOINPUT);
}

#[test]
fn given_missing_file_when_parse_command_then_ioerr() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing.txt");

    let err = run(&["parse", missing.to_str().unwrap()]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::IOERR);
}

#[test]
fn given_config_init_when_run_then_ok() {
    assert_eq!(run(&["config", "init"]).unwrap(), exitcode::OK);
}

#[test]
fn given_directory_as_output_when_merge_command_then_usage_and_nothing_written() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let mods = temp.path().join("mods");
    fs::create_dir_all(&mods).unwrap();
    fs::write(mods.join("a.txt"), "a = { x = 1 }\n").unwrap();
    let out_dir = temp.path().join("out");
    fs::create_dir_all(&out_dir).unwrap();

    // Act
    let err = run(&["merge", mods.to_str().unwrap(), "-o", out_dir.to_str().unwrap()]).unwrap_err();

    // Assert
    assert_eq!(err.exit_code(), exitcode::USAGE);
    assert!(err.to_string().contains("output target is a directory"));
    assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 0);
}

#[test]
fn given_directory_when_parse_command_then_usage() {
    let temp = TempDir::new().unwrap();

    let err = run(&["parse", temp.path().to_str().unwrap()]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::USAGE);
}

#[test]
fn given_script_file_when_parse_command_then_ok() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("a.txt");
    fs::write(&file, "a = { b = 1 }\n").unwrap();

    assert_eq!(run(&["parse", file.to_str().unwrap()]).unwrap(), exitcode::OK);
}
