//! Progress tracking across attempts: simulate two candidates, then compare.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn bandscore() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("bandscore").unwrap();
    cmd.env_remove("BANDSCORE_SEED");
    cmd
}

/// Run one attempt and return the saved JSON report.
fn attempt(dir: &Path, script: &str, label: &str) -> PathBuf {
    let config = dir.join("bandscore.toml");
    if !config.exists() {
        std::fs::write(
            &config,
            "seed = 3\n\n[consent]\naccepted = true\n\n[devices]\nspeech = \"silent\"\n",
        )
        .unwrap();
    }
    let output = dir.join(label);

    bandscore()
        .arg("simulate")
        .arg("--pool")
        .arg("../../pools/practice.toml")
        .arg("--script")
        .arg(script)
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    std::fs::read_dir(&output)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.extension().is_some_and(|e| e == "json"))
        .unwrap()
}

#[test]
fn compare_weaker_retake_shows_declines() {
    let dir = TempDir::new().unwrap();
    let strong = attempt(dir.path(), "../../scripts/strong.toml", "strong");
    let hesitant = attempt(dir.path(), "../../scripts/hesitant.toml", "hesitant");

    bandscore()
        .arg("compare")
        .arg("--baseline")
        .arg(&strong)
        .arg("--current")
        .arg(&hesitant)
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall band"))
        .stdout(predicate::str::contains("Declines"));

    bandscore()
        .arg("compare")
        .arg("--baseline")
        .arg(&strong)
        .arg("--current")
        .arg(&hesitant)
        .arg("--fail-on-decline")
        .assert()
        .code(1);
}

#[test]
fn compare_stronger_retake_passes_gate() {
    let dir = TempDir::new().unwrap();
    let strong = attempt(dir.path(), "../../scripts/strong.toml", "strong");
    let hesitant = attempt(dir.path(), "../../scripts/hesitant.toml", "hesitant");

    bandscore()
        .arg("compare")
        .arg("--baseline")
        .arg(&hesitant)
        .arg("--current")
        .arg(&strong)
        .arg("--fail-on-decline")
        .assert()
        .success()
        .stdout(predicate::str::contains("Improvements"));
}

#[test]
fn compare_markdown_and_html() {
    let dir = TempDir::new().unwrap();
    let strong = attempt(dir.path(), "../../scripts/strong.toml", "strong");
    let hesitant = attempt(dir.path(), "../../scripts/hesitant.toml", "hesitant");
    let html = dir.path().join("progress.html");

    bandscore()
        .arg("compare")
        .arg("--baseline")
        .arg(&hesitant)
        .arg("--current")
        .arg(&strong)
        .arg("--format")
        .arg("markdown")
        .arg("--html")
        .arg(&html)
        .assert()
        .success()
        .stdout(predicate::str::contains("| Section | Baseline | Current | Delta |"))
        .stdout(predicate::str::contains("| overall |"));

    let page = std::fs::read_to_string(&html).unwrap();
    assert!(page.contains("<html"));
}

#[test]
fn same_attempt_is_unchanged() {
    let dir = TempDir::new().unwrap();
    let strong = attempt(dir.path(), "../../scripts/strong.toml", "strong");

    bandscore()
        .arg("compare")
        .arg("--baseline")
        .arg(&strong)
        .arg("--current")
        .arg(&strong)
        .arg("--fail-on-decline")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 improved, 0 declined"));
}
