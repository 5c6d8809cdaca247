//! End-to-end tests of the devassist binary

mod common;

use assert_cmd::Command;
use common::{work_dir, TestLibrary};
use predicates::prelude::*;
use std::fs;

fn devassist() -> Command {
    let mut cmd = Command::cargo_bin("devassist").unwrap();
    cmd.env_remove("DEVASSIST_PATH").env_remove("RUST_LOG");
    cmd
}

fn library() -> TestLibrary {
    let library = TestLibrary::new();
    library
        .assistant(
            "crt",
            &["hello"],
            r#"
fullname: Hello World
description: Greets a new project
args:
  name:
    flags: [-n, --name]
    required: true
files:
  readme: {source: README.md}
dependencies:
  - rpm: [hello]
run:
  - cl: mkdir -p $name
  - cl: cp *readme $name/README.md
  - dda_c: $name
"#,
        )
        .assistant("crt", &["hello", "loud"], "run:\n  - cl: echo LOUD > loud.txt\n")
        .assistant("crt", &["failing"], "run:\n  - cl: echo broken pipe; false\n")
        .file("crt/hello/README.md", "# hello\n");
    library
}

#[test]
fn test_run_creates_project() {
    let library = library();
    let (_work, dir) = work_dir();

    devassist()
        .arg("-l")
        .arg(library.root())
        .args(["run", "crt", "hello", "-a", "name=proj", "--no-deps", "-C"])
        .arg(&dir)
        .assert()
        .success();

    let project = dir.join("proj");
    assert_eq!(
        fs::read_to_string(project.join("README.md")).unwrap(),
        "# hello\n"
    );
    let marker = fs::read_to_string(project.join(".devassistant")).unwrap();
    assert!(marker.contains("hello"));
    assert!(marker.contains("proj"));
}

#[test]
fn test_run_subassistant() {
    let library = library();
    let (_work, dir) = work_dir();

    devassist()
        .arg("-l")
        .arg(library.root())
        .args(["run", "crt", "hello", "loud", "-a", "name=proj", "--no-deps"])
        .current_dir(&dir)
        .assert()
        .success();

    assert!(dir.join("loud.txt").exists());
    assert!(!dir.join("proj").exists());
}

#[test]
fn test_failing_command_exits_with_output() {
    let library = library();
    let (_work, dir) = work_dir();

    devassist()
        .arg("-l")
        .arg(library.root())
        .args(["-s", "run", "crt", "failing", "--no-deps"])
        .current_dir(&dir)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("broken pipe"));
}

#[test]
fn test_missing_required_argument() {
    let library = library();
    let (_work, dir) = work_dir();

    devassist()
        .arg("-l")
        .arg(library.root())
        .args(["run", "crt", "hello", "--no-deps"])
        .current_dir(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("name"));
}

#[test]
fn test_unknown_assistant() {
    let library = library();

    devassist()
        .arg("-l")
        .arg(library.root())
        .args(["run", "crt", "ruby", "--no-deps"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("crt ruby"));
}

#[test]
fn test_list_assistants() {
    let library = library();

    devassist()
        .arg("-l")
        .arg(library.root())
        .arg("list")
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("crt"))
        .stdout(predicate::str::contains("hello - Greets a new project"))
        .stdout(predicate::str::contains("loud"));
}

#[test]
fn test_completions() {
    devassist()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("devassist"));
}

#[test]
fn test_unknown_role_is_rejected() {
    devassist()
        .args(["run", "build", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("build"));
}
