//! End-to-end session tests: run the binary against the practice pool with
//! synthetic devices and inspect the saved report.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use bandscore_core::model::{Section, ZeroReason};
use bandscore_core::report::SessionReport;
use bandscore_core::statistics::BAND_CEILING;

fn bandscore() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("bandscore").unwrap();
    cmd.env_remove("BANDSCORE_SEED");
    cmd
}

fn write_config(dir: &Path, capture: &str) -> PathBuf {
    let path = dir.join("bandscore.toml");
    std::fs::write(
        &path,
        format!(
            r#"seed = 11

[consent]
accepted = true

[devices]
capture = "{capture}"
speech = "silent"
"#
        ),
    )
    .unwrap();
    path
}

fn only_report(dir: &Path, ext: &str) -> PathBuf {
    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect();
    assert_eq!(found.len(), 1, "expected one .{ext} file in {}", dir.display());
    found.remove(0)
}

fn simulate(config: &Path, script: &str, output: &Path) -> SessionReport {
    bandscore()
        .arg("simulate")
        .arg("--pool")
        .arg("../../pools/practice.toml")
        .arg("--script")
        .arg(script)
        .arg("--config")
        .arg(config)
        .arg("--output")
        .arg(output)
        .assert()
        .success()
        .stderr(predicate::str::contains("Results saved to"));

    SessionReport::load_json(&only_report(output, "json")).unwrap()
}

#[test]
fn strong_candidate_full_session() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "synthetic");
    let output = dir.path().join("results");

    let report = simulate(&config, "../../scripts/strong.toml", &output);

    assert_eq!(report.results.len(), 24);
    assert_eq!(report.items.len(), 24);
    assert_eq!(
        report.candidate.as_ref().map(|c| c.name.as_str()),
        Some("Ada Lovelace")
    );
    assert_eq!(report.auto_zeros().count(), 0);
    assert!(report.intro_recording.is_some());

    // Every closed-form reading item answered from the key.
    assert_eq!(report.aggregate.section(Section::Reading).band, BAND_CEILING);

    for section in Section::ALL {
        let score = report.aggregate.section(section);
        assert!(score.item_count > 0, "{section} was not attempted");
        assert!(score.band > 10, "{section} band {}", score.band);
    }
    assert!(report.aggregate.sub_skills.spoken_items > 0);
}

#[test]
fn same_seed_draws_the_same_items() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "synthetic");

    let first = simulate(
        &config,
        "../../scripts/strong.toml",
        &dir.path().join("first"),
    );
    let second = simulate(
        &config,
        "../../scripts/strong.toml",
        &dir.path().join("second"),
    );

    let ids = |r: &SessionReport| r.items.iter().map(|i| i.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn unavailable_microphone_zeroes_speaking() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "unavailable");
    let output = dir.path().join("results");

    let report = simulate(&config, "../../scripts/strong.toml", &output);

    assert_eq!(report.results.len(), 24);
    let spoken: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.kind.is_spoken())
        .collect();
    assert!(!spoken.is_empty());
    for r in spoken {
        assert_eq!(r.score, 0);
        assert!(r.auto_zero);
        assert_eq!(r.zero_reason, Some(ZeroReason::NoAudioCaptured));
    }
    assert_eq!(report.aggregate.section(Section::Speaking).band, 10);
    // Non-spoken sections are unaffected.
    assert_eq!(report.aggregate.section(Section::Reading).band, BAND_CEILING);
}

#[test]
fn html_and_json_with_format_all() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "synthetic");
    let output = dir.path().join("results");

    bandscore()
        .arg("simulate")
        .arg("--pool")
        .arg("../../pools/practice.toml")
        .arg("--script")
        .arg("../../scripts/hesitant.toml")
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .arg("--format")
        .arg("all")
        .assert()
        .success()
        .stderr(predicate::str::contains("HTML report"));

    let html = std::fs::read_to_string(only_report(&output, "html")).unwrap();
    assert!(html.contains("Overall band"));
    assert!(html.contains("<svg"));
    only_report(&output, "json");
}

#[test]
fn default_candidate_without_script() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "synthetic");
    let output = dir.path().join("results");

    bandscore()
        .arg("simulate")
        .arg("--pool")
        .arg("../../pools/practice.toml")
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let report = SessionReport::load_json(&only_report(&output, "json")).unwrap();
    assert_eq!(report.results.len(), 24);
    assert_eq!(report.aggregate.section(Section::Reading).band, BAND_CEILING);
}

#[test]
fn declined_disclaimer_needs_consent_on_file() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("declines.toml");
    std::fs::write(
        &script,
        "[candidate]\nname = \"Lin\"\nacknowledge_disclaimer = false\n",
    )
    .unwrap();
    let config = dir.path().join("bandscore.toml");
    std::fs::write(&config, "[consent]\naccepted = false\n").unwrap();

    let run = |output: &str| {
        let mut cmd = bandscore();
        cmd.arg("simulate")
            .arg("--pool")
            .arg("../../pools/practice.toml")
            .arg("--script")
            .arg(&script)
            .arg("--config")
            .arg(&config)
            .arg("--output")
            .arg(dir.path().join(output));
        cmd
    };

    run("refused")
        .assert()
        .failure()
        .stderr(predicate::str::contains("disclaimer was not accepted"));

    bandscore()
        .arg("consent")
        .arg("--accept")
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    run("accepted").assert().success();
}

#[test]
fn missing_pool_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "synthetic");

    bandscore()
        .arg("simulate")
        .arg("--pool")
        .arg("no-such-pool.toml")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn unknown_format_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "synthetic");

    bandscore()
        .arg("simulate")
        .arg("--pool")
        .arg("../../pools/practice.toml")
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(dir.path().join("results"))
        .arg("--format")
        .arg("pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format"));
}

#[test]
fn zero_tick_length_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bandscore.toml");
    std::fs::write(
        &config,
        "[consent]\naccepted = true\n\n[timing]\ntick_millis = 0\n",
    )
    .unwrap();

    bandscore()
        .arg("simulate")
        .arg("--pool")
        .arg("../../pools/practice.toml")
        .arg("--config")
        .arg(&config)
        .arg("--realtime")
        .arg("--output")
        .arg(dir.path().join("results"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("tick_millis must be greater than 0"));
}
