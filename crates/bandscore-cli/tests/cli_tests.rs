//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use bandscore_core::model::{CandidateInfo, Item, ItemKind, ScoreResult, ZeroReason};
use bandscore_core::report::SessionReport;
use bandscore_core::session::Advisory;
use bandscore_core::statistics::aggregate;

fn bandscore() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("bandscore").unwrap()
}

#[test]
fn validate_practice_pool() {
    bandscore()
        .arg("validate")
        .arg("--pool")
        .arg("../../pools/practice.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("Practice Pool"))
        .stdout(predicate::str::contains("29 items"))
        .stdout(predicate::str::contains("All pools valid"));
}

#[test]
fn validate_pool_directory() {
    bandscore()
        .arg("validate")
        .arg("--pool")
        .arg("../../pools")
        .assert()
        .success()
        .stdout(predicate::str::contains("Practice Pool"));
}

#[test]
fn validate_reports_thin_coverage() {
    let dir = TempDir::new().unwrap();
    let pool = dir.path().join("tiny.toml");
    std::fs::write(
        &pool,
        r#"
[pool]
id = "tiny"
name = "Tiny"

[[items]]
id = "mcs-1"
kind = "multiple-choice-single"
prompt = "Pick one"
options = ["A", "B"]
answer = ["A"]
"#,
    )
    .unwrap();

    bandscore()
        .arg("validate")
        .arg("--pool")
        .arg(&pool)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 items"))
        .stdout(predicate::str::contains("warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    bandscore()
        .arg("validate")
        .arg("--pool")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    bandscore()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created bandscore.toml"))
        .stdout(predicate::str::contains("Created pools/practice.toml"))
        .stdout(predicate::str::contains("Created scripts/candidate.toml"));

    assert!(dir.path().join("bandscore.toml").exists());
    assert!(dir.path().join("pools/practice.toml").exists());
    assert!(dir.path().join("scripts/candidate.toml").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    bandscore()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    bandscore()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn init_output_validates() {
    let dir = TempDir::new().unwrap();

    bandscore()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    bandscore()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--pool")
        .arg("pools/practice.toml")
        .arg("--config")
        .arg("bandscore.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("All pools valid"));
}

#[test]
fn consent_accept_and_revoke_keep_comments() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bandscore.toml");
    std::fs::write(&config, "# my settings\n[consent]\naccepted = false\n").unwrap();

    bandscore()
        .arg("consent")
        .arg("--accept")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Disclaimer accepted"));

    let content = std::fs::read_to_string(&config).unwrap();
    assert!(content.contains("# my settings"));
    assert!(content.contains("accepted = true"));

    bandscore()
        .arg("consent")
        .arg("--revoke")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("revoked"));

    let content = std::fs::read_to_string(&config).unwrap();
    assert!(content.contains("accepted = false"));
}

#[test]
fn consent_requires_a_decision() {
    bandscore().arg("consent").assert().failure();
}

#[test]
fn show_text_report() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.json");
    make_test_report().save_json(&path).unwrap();

    bandscore()
        .arg("show")
        .arg("--report")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Grace"))
        .stdout(predicate::str::contains("Overall band"))
        .stdout(predicate::str::contains("rs-1"))
        .stdout(predicate::str::contains("120 words, expected 200-300"))
        .stdout(predicate::str::contains("time is up for we-1"));
}

#[test]
fn show_json_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.json");
    let report = make_test_report();
    report.save_json(&path).unwrap();

    let output = bandscore()
        .arg("show")
        .arg("--report")
        .arg(&path)
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let shown: SessionReport = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown.results, report.results);
}

#[test]
fn compare_reports() {
    let dir = TempDir::new().unwrap();
    let baseline_path = dir.path().join("baseline.json");
    let current_path = dir.path().join("current.json");

    let baseline = make_test_report();
    let mut current = make_test_report();
    current.results[2] = ScoreResult::new(&current.items[2], 1);
    current.results[1] = ScoreResult::new(&current.items[1], 10);
    current.aggregate = aggregate(&current.results);

    baseline.save_json(&baseline_path).unwrap();
    current.save_json(&current_path).unwrap();

    bandscore()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline_path)
        .arg("--current")
        .arg(&current_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall band"))
        .stdout(predicate::str::contains("Improvements"))
        .stdout(predicate::str::contains("writing"));
}

#[test]
fn compare_fail_on_decline() {
    let dir = TempDir::new().unwrap();
    let baseline_path = dir.path().join("baseline.json");
    let current_path = dir.path().join("current.json");

    let mut baseline = make_test_report();
    baseline.results[1] = ScoreResult::new(&baseline.items[1], 10);
    baseline.aggregate = aggregate(&baseline.results);
    let current = make_test_report();

    baseline.save_json(&baseline_path).unwrap();
    current.save_json(&current_path).unwrap();

    bandscore()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline_path)
        .arg("--current")
        .arg(&current_path)
        .arg("--fail-on-decline")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Declines"));
}

#[test]
fn compare_nonexistent_report() {
    bandscore()
        .arg("compare")
        .arg("--baseline")
        .arg("no_such_file.json")
        .arg("--current")
        .arg("also_no_file.json")
        .assert()
        .failure();
}

#[test]
fn help_output() {
    bandscore()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("band scoring"));
}

#[test]
fn version_output() {
    bandscore()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bandscore"));
}

/// A small finished attempt with one auto-zero and one advisory.
fn make_test_report() -> SessionReport {
    let items = vec![
        Item::new("rs-1", ItemKind::RepeatSentence, "Repeat"),
        Item::new("we-1", ItemKind::WriteEssay, "Discuss"),
        Item::new("mcs-1", ItemKind::MultipleChoiceSingle, "Pick")
            .with_options(["A", "B"])
            .with_answer(["A"]),
    ];
    let results = vec![
        ScoreResult::new(&items[0], 7),
        ScoreResult::zero(
            &items[1],
            ZeroReason::WordCount {
                found: 120,
                min: 200,
                max: 300,
            },
        ),
        ScoreResult::zero(&items[2], ZeroReason::Incorrect),
    ];

    SessionReport {
        session_id: uuid::Uuid::new_v4(),
        created_at: chrono::Utc::now(),
        started_at: chrono::Utc::now(),
        candidate: Some(CandidateInfo {
            name: "Grace Hopper".into(),
            ..Default::default()
        }),
        aggregate: aggregate(&results),
        items,
        results,
        advisories: vec![Advisory::ItemTimedOut {
            item_id: "we-1".into(),
        }],
        intro_recording: None,
    }
}
