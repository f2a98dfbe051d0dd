use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn revdiff(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_revdiff"))
        .args(args)
        .current_dir(dir)
        .env_remove("REVDIFF_EXTERNAL_DIFF")
        .env_remove("REVDIFF_DEBUG_COMMENTS")
        .env("REVDIFF_LOG", "off")
        .output()
        .expect("run revdiff")
}

#[test]
fn prints_localised_table_for_two_files() {
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("old.txt"), "one\ntwo\nthree\n").expect("write old");
    fs::write(temp.path().join("new.txt"), "one\n2\nthree\n").expect("write new");

    let output = revdiff(&["old.txt", "new.txt", "--no-in-process"], temp.path());
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    assert!(stdout.contains("Line 1:"));
    assert!(stdout.contains("diff-deletedline"));
    assert!(!stdout.contains("<!--LINE"));
}

#[test]
fn debug_flag_appends_generator_trailer() {
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("a"), "x\n").expect("write a");
    fs::write(temp.path().join("b"), "y\n").expect("write b");

    let output = revdiff(&["a", "b", "--no-in-process", "--debug"], temp.path());
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    assert!(stdout.contains("<!-- diff generator: internal "));
}

#[test]
fn lists_backends_as_json() {
    let temp = TempDir::new().expect("tempdir");
    let output = revdiff(&["--list-backends"], temp.path());
    assert!(output.status.success(), "{output:?}");
    let summaries: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("json output");
    let last = summaries
        .as_array()
        .and_then(|list| list.last())
        .expect("at least one backend");
    assert_eq!(last["id"], "builtin");
}

#[test]
fn missing_file_is_an_error() {
    let temp = TempDir::new().expect("tempdir");
    let output = revdiff(&["absent.txt", "also-absent.txt"], temp.path());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read absent.txt"));
}
