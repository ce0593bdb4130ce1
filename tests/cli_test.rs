//! End-to-end tests for the command-line interface

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::{tempdir, TempDir};

const CONFIG: &str = "[report]\ntimezone = \"UTC\"\nopen_in_viewer = false\n";

/// Working directory holding an export and a config file
fn workspace() -> TempDir {
    let dir = tempdir().expect("Failed to create temp directory");
    let doc = json!({"chats": [
        {
            "contactName": "Ana Lopez",
            "key": "15550001111@s.whatsapp.net",
            "messages": [
                {"type": "text", "text": "morning", "timestamp": "2024-02-02T08:00:00Z", "fromMe": false},
                {"type": "text", "text": "hi <b>there</b>", "timestamp": "2024-02-02T08:05:00Z", "fromMe": true},
                {"type": "text", "text": "no time", "fromMe": false},
                {"type": "image", "timestamp": "2024-02-03T12:00:00Z", "fromMe": false}
            ]
        }
    ]});
    fs::write(dir.path().join("ChatLog.json"), doc.to_string()).unwrap();
    fs::write(dir.path().join("test.toml"), CONFIG).unwrap();
    dir
}

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("chat-history-search").unwrap();
    cmd.current_dir(dir)
        .env_remove("CHAT_HISTORY_STORE")
        .env_remove("RUST_LOG")
        .args(["--config", "test.toml"]);
    cmd
}

fn report_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "html"))
        .collect()
}

#[test]
fn test_build_then_query() {
    let dir = workspace();

    cli(dir.path()).args(["build-index", "ChatLog.json"]).assert().success();
    assert!(dir.path().join("ChatLog.db").is_file());

    cli(dir.path())
        .args(["query", "ChatLog.json", "2024-02-02", "--no-open"])
        .assert()
        .success();

    let html = fs::read_to_string(dir.path().join("ChatLog_2024-02-02.html")).unwrap();
    assert!(html.contains("morning"));
    assert!(html.contains("hi &lt;b&gt;there&lt;/b&gt;"));
    assert!(!html.contains("<b>there"));
}

#[test]
fn test_query_by_store_path() {
    let dir = workspace();
    cli(dir.path()).args(["build-index", "ChatLog.json"]).assert().success();

    cli(dir.path())
        .args(["query", "ChatLog.db", "2024-02-03", "--no-open", "--output-dir", "reports"])
        .assert()
        .success();

    assert!(dir.path().join("reports").join("ChatLog_2024-02-03.html").is_file());
}

#[test]
fn test_rebuild_requires_force() {
    let dir = workspace();
    cli(dir.path()).args(["build-index", "ChatLog.json"]).assert().success();

    cli(dir.path())
        .args(["build-index", "ChatLog.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    cli(dir.path()).args(["build-index", "ChatLog.json", "--force"]).assert().success();
}

#[test]
fn test_force_and_append_conflict() {
    let dir = workspace();
    cli(dir.path())
        .args(["build-index", "ChatLog.json", "--force", "--append"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_date_fails_without_report() {
    let dir = workspace();
    cli(dir.path()).args(["build-index", "ChatLog.json"]).assert().success();

    cli(dir.path())
        .args(["query", "ChatLog.db", "2024-13-40", "--no-open"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));

    assert!(report_files(dir.path()).is_empty());
}

#[test]
fn test_query_without_store_fails() {
    let dir = workspace();

    cli(dir.path())
        .args(["query", "ChatLog.json", "2024-02-02", "--no-open"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Store not found"));

    assert!(report_files(dir.path()).is_empty());
}

#[test]
fn test_malformed_export_fails() {
    let dir = workspace();
    fs::write(dir.path().join("broken.json"), "[{").unwrap();

    cli(dir.path())
        .args(["build-index", "broken.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed input"));

    assert!(!dir.path().join("broken.db").exists());
}

#[test]
fn test_days_lists_counts() {
    let dir = workspace();
    cli(dir.path()).args(["build-index", "ChatLog.json"]).assert().success();

    cli(dir.path())
        .args(["days", "ChatLog.db"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-02-02  2"))
        .stdout(predicate::str::contains("2024-02-03  1"));
}
