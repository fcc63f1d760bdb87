// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_project(root: &Path, dir: &str, descriptor: &str) {
    let path = root.join(dir);
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("stepflow.yaml"), descriptor).unwrap();
}

fn stepflow(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stepflow").unwrap();
    cmd.current_dir(root).env("NO_COLOR", "1").env("RUST_LOG", "off");
    cmd
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_project(
        dir.path(),
        "util",
        r#"
name: util
version: 1.0.0
steps:
  - id: build
    sources:
      include: ["src/**/*.txt"]
    run: "mkdir -p out && cat src/*.txt > out/{project.name}.bin"
    artifacts:
      - id: bin
        files:
          include: ["out/*.bin"]
flows:
  - name: ci
    dag: ["build"]
"#,
    );
    fs::create_dir_all(dir.path().join("util/src")).unwrap();
    fs::write(dir.path().join("util/src/a.txt"), "hello").unwrap();

    write_project(
        dir.path(),
        "lib",
        "name: lib\ndependencies: [util]\n",
    );
    write_project(
        dir.path(),
        "app",
        r#"
name: app
dependencies: [lib]
steps:
  - id: prepare
    run: "echo prepared"
  - id: test
    run: "echo testing {project.name} in {flow}"
flows:
  - name: ci
    dag: ["prepare>test"]
"#,
    );
    dir
}

#[test]
fn order_lists_dependencies_first() {
    let dir = workspace();

    stepflow(dir.path())
        .arg("order")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?s)1\. util.*2\. lib.*3\. app").unwrap());
}

#[test]
fn order_reports_cycles() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path(), "a", "name: a\ndependencies: [b]\n");
    write_project(dir.path(), "b", "name: b\ndependencies: [a]\n");

    stepflow(dir.path())
        .arg("order")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cyclic dependency detected"));
}

#[test]
fn graph_renders_mermaid() {
    let dir = workspace();

    stepflow(dir.path())
        .args(["graph", "--format", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("graph"))
        .stdout(predicate::str::contains("\"util\""))
        .stdout(predicate::str::contains("-->"));
}

#[test]
fn graph_for_unknown_project_fails() {
    let dir = workspace();

    stepflow(dir.path())
        .args(["graph", "--project", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn run_then_status_is_ok() {
    let dir = workspace();

    stepflow(dir.path())
        .args(["status", "util", "ci"])
        .assert()
        .success()
        .stdout(predicate::str::contains("none"));

    stepflow(dir.path())
        .args(["run", "util", "ci", "build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("util/ci/build succeeded"));

    assert!(dir
        .path()
        .join(".stepflow/artifacts/util/ci/build/bin/out/util.bin")
        .is_file());

    stepflow(dir.path())
        .args(["status", "util", "ci"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));

    fs::write(dir.path().join("util/src/a.txt"), "changed").unwrap();

    stepflow(dir.path())
        .args(["status", "util", "ci", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"build\": \"outdated\""));
}

#[test]
fn run_with_upstream_runs_previous_steps() {
    let dir = workspace();

    stepflow(dir.path())
        .args(["run", "app", "ci", "test", "--upstream", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("testing app in ci"));

    stepflow(dir.path())
        .args(["manifest", "app", "ci", "prepare"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"succeeded\": true"));
}

#[test]
fn failing_step_records_manifest() {
    let dir = TempDir::new().unwrap();
    write_project(
        dir.path(),
        "bad",
        r#"
name: bad
steps:
  - id: broken
    run: "exit 3"
flows:
  - name: ci
    dag: ["broken"]
"#,
    );

    stepflow(dir.path())
        .args(["run", "bad", "ci", "broken"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exited with code 3"));

    stepflow(dir.path())
        .args(["manifest", "bad", "ci", "broken"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"succeeded\": false"));

    stepflow(dir.path())
        .args(["status", "bad", "ci"])
        .assert()
        .success()
        .stdout(predicate::str::contains("outdated"));
}

#[test]
fn manifest_missing_is_an_error() {
    let dir = workspace();

    stepflow(dir.path())
        .args(["manifest", "util", "ci", "build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No manifest recorded"));
}
