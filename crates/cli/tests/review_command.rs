//! Black-box runs of the `kaizen` binary with echo-based analyzers.

use std::path::Path;
use std::process::Command;

fn kaizen() -> Command {
    Command::new(env!("CARGO_BIN_EXE_kaizen"))
}

fn write_echo_descriptors(dir: &Path) -> std::path::PathBuf {
    let descriptors = r#"[
        {
            "name": "echo-lint",
            "command": "echo",
            "args": ["{file}:1:1: high: possible null dereference"],
            "extensions": ["py"],
            "parser": "colon"
        }
    ]"#;
    let path = dir.join("analyzers.json");
    std::fs::write(&path, descriptors).unwrap();
    path
}

#[test]
fn dry_run_reports_issues_and_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("sample.py");
    std::fs::write(&target, "x = cache[key]\n").unwrap();
    let descriptors = write_echo_descriptors(dir.path());

    let output = kaizen()
        .args(["review", "--format", "json", "--analyzers"])
        .arg(&descriptors)
        .arg(&target)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["entries"].as_array().unwrap().len(), 1);
    // No fix to auto-accept, so the dry-run policy defers it for a human.
    assert_eq!(report["entries"][0]["state"], "deferred");
    assert_eq!(report["counts"]["deferred"], 1);
    // Dry run must not create backups.
    assert!(!dir.path().join(".kaizen-backups").exists());
}

#[test]
fn clean_tree_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("sample.py");
    std::fs::write(&target, "x = 1\n").unwrap();

    // An analyzer that prints nothing reports no findings.
    let descriptors = dir.path().join("analyzers.json");
    std::fs::write(
        &descriptors,
        r#"[{"name": "silent", "command": "true", "args": [], "extensions": ["py"], "parser": "colon"}]"#,
    )
    .unwrap();

    let output = kaizen()
        .args(["review", "--format", "rich", "--analyzers"])
        .arg(&descriptors)
        .arg(&target)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn batch_apply_mutates_the_file_and_backs_it_up() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("sample.py");
    std::fs::write(&target, "level = warn\n").unwrap();
    let descriptors = write_echo_descriptors(dir.path());

    let feedback = dir.path().join("feedback.json");
    let suggestion = serde_json::json!([{
        "file": target,
        "line_start": 1,
        "line_end": 1,
        "severity": "medium",
        "source_tools": ["llm"],
        "message": "unquoted literal level",
        "fixes": [{
            "description": "quote literal",
            "original_code": "level = warn",
            "fixed_code": "level = \"warn\"",
            "safety": "unknown",
            "confidence": 0.95
        }]
    }]);
    std::fs::write(&feedback, suggestion.to_string()).unwrap();

    let backups = dir.path().join("backups");
    let output = kaizen()
        .args(["review", "--apply-changes", "--batch-safe", "--format", "json"])
        .arg("--feedback")
        .arg(&feedback)
        .arg("--analyzers")
        .arg(&descriptors)
        .arg("--backup-dir")
        .arg(&backups)
        .arg(&target)
        .output()
        .unwrap();

    let content = std::fs::read_to_string(&target).unwrap();
    assert_eq!(content, "level = \"warn\"\n");
    assert!(backups.exists());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["counts"]["applied"], 1);
}

#[test]
fn analyzers_command_lists_defaults() {
    let output = kaizen().arg("analyzers").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ruff"));
    assert!(stdout.contains("eslint"));
}
