#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn rollcall(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rollcall").unwrap();
    cmd.current_dir(dir.path())
        .env("ROLLCALL_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &TempDir, rel: &str, body: &str) {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

fn json_output(cmd: &mut Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("stdout should be JSON")
}

fn exists(dir: &TempDir, rel: &str) -> bool {
    dir.path().join(rel).exists()
}

// ---------------------------------------------------------------------------
// rollcall init
// ---------------------------------------------------------------------------

#[test]
fn init_writes_default_config() {
    let dir = TempDir::new().unwrap();
    rollcall(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .rollcall/config.yaml"));

    let config = std::fs::read_to_string(dir.path().join(".rollcall/config.yaml")).unwrap();
    assert!(config.contains("planning_paths"));
    assert!(config.contains("use_gitignore: true"));
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    rollcall(&dir).arg("init").assert().success();
    rollcall(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .rollcall/config.yaml"));
}

#[test]
fn init_rejects_broken_config() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".rollcall/config.yaml", "scan:\n  min_confidence: 250\n");
    rollcall(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// ---------------------------------------------------------------------------
// rollcall scan
// ---------------------------------------------------------------------------

#[test]
fn scan_lists_code_todos() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "src/lib.rs",
        "fn a() {}\n\nfn b() {}\n\n// TODO: fix this\n",
    );
    rollcall(&dir)
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("src/lib.rs:5"))
        .stdout(predicate::str::contains("fix this"));
}

#[test]
fn scan_json_reports_items_and_summary() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.py", "# FIXME: handle timeouts\nx = 1\n");
    let out = json_output(rollcall(&dir).args(["scan", "--json"]));

    let todos = out["todos"].as_array().unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0]["type"], "FIXME");
    assert_eq!(todos[0]["priority"], "high");
    assert_eq!(todos[0]["line"], 1);
    assert_eq!(out["summary"]["total"], 1);
}

#[test]
fn checked_items_need_include_completed() {
    let dir = TempDir::new().unwrap();
    write(&dir, "TASKS.md", "- [ ] Write docs\n- [x] Ship feature X\n");

    let out = json_output(rollcall(&dir).args(["scan", "-j"]));
    let todos = out["todos"].as_array().unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0]["content"], "Write docs");

    let out = json_output(rollcall(&dir).args(["scan", "-j", "--include-completed"]));
    assert_eq!(out["todos"].as_array().unwrap().len(), 2);
}

#[test]
fn scan_respects_gitignore_and_excludes() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".gitignore", "generated/\n");
    write(&dir, "generated/out.rs", "// TODO: ignored\n");
    write(&dir, "fixtures/sample.rs", "// TODO: excluded\n");
    write(&dir, "src/main.rs", "// TODO: kept\n");

    let out = json_output(rollcall(&dir).args(["scan", "-j", "--exclude", "fixtures/**"]));
    let files: Vec<&str> = out["todos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["file"].as_str().unwrap())
        .collect();
    assert_eq!(files, vec!["src/main.rs"]);
}

#[test]
fn exclude_archives_drops_archived_files() {
    let dir = TempDir::new().unwrap();
    write(&dir, "archive/2022/notes.md", "- [ ] Old task\n");
    let out = json_output(rollcall(&dir).args(["scan", "-j", "--exclude-archives"]));
    assert!(out["todos"].as_array().unwrap().is_empty());
}

#[test]
fn saved_state_limits_new_only_to_added_markers() {
    let dir = TempDir::new().unwrap();
    write(&dir, "src/lib.rs", "// TODO: first\n");
    rollcall(&dir)
        .args(["scan", "--save-state"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved .rollcall/state.json"));
    assert!(exists(&dir, ".rollcall/state.json"));

    let out = json_output(rollcall(&dir).args(["scan", "-j", "--new-only"]));
    assert!(out["todos"].as_array().unwrap().is_empty());

    write(&dir, "src/lib.rs", "// TODO: first\n// TODO: second\n");
    let out = json_output(rollcall(&dir).args(["scan", "-j", "--new-only"]));
    let todos = out["todos"].as_array().unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0]["content"], "second");
}

#[test]
fn missing_root_is_an_error() {
    let dir = TempDir::new().unwrap();
    rollcall(&dir)
        .args(["scan", "--root"])
        .arg(dir.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: failed to scan"))
        .stderr(predicate::str::contains("does not exist"));
}

// ---------------------------------------------------------------------------
// rollcall analyze
// ---------------------------------------------------------------------------

#[test]
fn analyze_recommends_checked_items() {
    let dir = TempDir::new().unwrap();
    write(&dir, "TASKS.md", "# Release\n\n- [x] Ship feature X\n");
    write(&dir, "src/lib.rs", "fn main() {}\n// TODO: fix this\n");

    let out = json_output(rollcall(&dir).args(["analyze", "-j", "--include-completed"]));
    assert_eq!(out["totalTodos"], 2);

    let safe = out["recommendations"]["safeToClose"].as_array().unwrap();
    assert_eq!(safe.len(), 1);
    assert_eq!(safe[0]["confidence"], 95);
    assert_eq!(safe[0]["todo"]["type"], "Unchecked Task");
    assert_eq!(safe[0]["isLikelyCompleted"], true);

    assert_eq!(out["buckets"]["veryHigh"], 1);
    assert_eq!(out["buckets"]["minimal"], 1);
}

#[test]
fn analyze_min_confidence_filters() {
    let dir = TempDir::new().unwrap();
    write(&dir, "TASKS.md", "- [x] Ship feature X\n");
    write(&dir, "src/lib.rs", "// TODO: fix this\n");

    let out = json_output(rollcall(&dir).args([
        "analyze",
        "-j",
        "--include-completed",
        "--min-confidence",
        "50",
    ]));
    assert_eq!(out["totalTodos"], 2);
    assert_eq!(out["analyses"].as_array().unwrap().len(), 1);
}

#[test]
fn analyze_markdown_report() {
    let dir = TempDir::new().unwrap();
    write(&dir, "TASKS.md", "- [x] Ship feature X\n");
    rollcall(&dir)
        .args(["analyze", "--markdown", "--include-completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# TODO Completion Report"))
        .stdout(predicate::str::contains("## Safe to Close (1)"));
}

#[test]
fn analyze_rejects_out_of_range_confidence() {
    let dir = TempDir::new().unwrap();
    rollcall(&dir)
        .args(["analyze", "--min-confidence", "101"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--min-confidence"));
}

#[test]
fn analyze_with_git_outside_repo_still_works() {
    let dir = TempDir::new().unwrap();
    write(&dir, "src/lib.rs", "// TODO: fix this\n");
    rollcall(&dir)
        .args(["analyze", "--git"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Analyzed 1 TODOs"));
}

// ---------------------------------------------------------------------------
// rollcall detect
// ---------------------------------------------------------------------------

fn checkout_project(dir: &TempDir) {
    write(
        dir,
        "docs/PLAN.md",
        "# Checkout\n\n- [ ] Implement Foo widget\n  File: /src/foo.ts\n- [ ] Quantum teleportation\n- [ ] Run the tests\n",
    );
    write(dir, "src/foo.ts", "export class Foo { render() { return 'widget'; } }\n");
    write(dir, "src/app.ts", "import { Foo } from './foo';\n");
    write(dir, "src/page.ts", "import { Foo } from './foo';\n");
    write(dir, "src/foo.test.ts", "import { Foo } from './foo';\n");
}

#[test]
fn detect_scores_planned_features() {
    let dir = TempDir::new().unwrap();
    checkout_project(&dir);

    let out = json_output(rollcall(&dir).args(["detect", "-j"]));
    let detections = out["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 2);

    assert_eq!(detections[0]["feature"]["description"], "Implement Foo widget");
    assert_eq!(detections[0]["confidence"], 100);
    assert_eq!(detections[0]["status"], "implemented");
    assert_eq!(detections[1]["status"], "missing");

    let doc = &out["documents"][0];
    assert_eq!(doc["path"], "docs/PLAN.md");
    assert_eq!(doc["title"], "Checkout");
    assert_eq!(doc["completionPercent"], 50);
}

#[test]
fn detect_with_explicit_plan_and_markdown() {
    let dir = TempDir::new().unwrap();
    checkout_project(&dir);
    write(&dir, "notes/ideas.md", "# Ideas\n- [ ] Implement Foo widget\n");

    rollcall(&dir)
        .args(["detect", "--markdown", "--plan", "notes/ideas.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Implementation Report"))
        .stdout(predicate::str::contains("## Ideas"))
        .stdout(predicate::str::contains("Checkout").not());
}

#[test]
fn detect_without_planning_documents() {
    let dir = TempDir::new().unwrap();
    write(&dir, "README.md", "# Readme\n");
    rollcall(&dir)
        .arg("detect")
        .assert()
        .success()
        .stdout(predicate::str::contains("No planning documents found."));
}

#[test]
fn detect_missing_plan_is_an_error() {
    let dir = TempDir::new().unwrap();
    rollcall(&dir)
        .args(["detect", "--plan", "missing.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("planning document not found"));
}
