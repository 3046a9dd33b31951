//! The `bandscore simulate` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use bandscore_core::engine::SessionObserver;
use bandscore_core::error::SessionError;
use bandscore_core::model::ItemKind;
use bandscore_core::pool::{check_coverage, load_pool};
use bandscore_core::report::SessionReport;
use bandscore_core::session::{Advisory, Phase};
use bandscore_devices::{create_capture, create_speech, load_config_from, VirtualClock};
use bandscore_report::write_html_report;
use bandscore_runner::{
    engine_from_config, IntervalTicks, ScriptedCandidate, SessionRunner, SyntheticTicks,
};

use super::{auto_zero_lines, band_table};

/// Spoken seconds used by the default candidate.
const DEFAULT_SPOKEN_SECS: u32 = 30;

/// Console progress observer.
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_phase(&self, _from: Phase, to: Phase) {
        eprintln!("== {to}");
    }

    fn on_item(&self, index: usize, total: usize, item_id: &str, kind: ItemKind) {
        eprintln!("  [{}/{total}] {item_id} ({kind})", index + 1);
    }

    fn on_advisory(&self, advisory: &Advisory) {
        eprintln!("  NOTE: {advisory}");
    }

    fn on_rejected(&self, event: &str, error: &SessionError) {
        eprintln!("  REJECTED {event}: {error}");
    }

    fn on_finished(&self, report: &SessionReport) {
        eprintln!(
            "\nComplete: {} items scored, overall band {}",
            report.results.len(),
            report.aggregate.overall
        );
    }
}

pub async fn execute(
    pool_path: PathBuf,
    script_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    seed: Option<u64>,
    realtime: bool,
    output: PathBuf,
    format: String,
) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if seed.is_some() {
        config.seed = seed;
    }

    let pool = load_pool(&pool_path)?;
    tracing::debug!(
        "pool {} loaded from {}, seed {:?}",
        pool.id,
        pool_path.display(),
        config.seed
    );
    for w in check_coverage(&pool, &config.blueprint) {
        eprintln!("Warning: {}", w.message);
    }

    let candidate = match &script_path {
        Some(path) => ScriptedCandidate::load(path)?,
        None => ScriptedCandidate::answer_key(DEFAULT_SPOKEN_SECS),
    };

    let formats: Vec<&str> = if format == "all" {
        vec!["json", "html"]
    } else {
        format.split(',').map(|f| f.trim()).collect()
    };
    for fmt in &formats {
        anyhow::ensure!(
            matches!(*fmt, "json" | "html"),
            "unknown format '{fmt}' (expected json, html or all)"
        );
    }

    eprintln!(
        "bandscore v{} - {} ({} items in pool, {} per test)",
        env!("CARGO_PKG_VERSION"),
        pool.name,
        pool.items().len(),
        config.blueprint.total()
    );

    let clock = VirtualClock::new();
    let engine = engine_from_config(
        &config,
        Arc::new(pool),
        create_capture(&config.devices, clock.clone()),
        create_speech(&config.devices),
    )
    .with_observer(Box::new(ConsoleObserver));

    let report = if realtime {
        let ticks = IntervalTicks::new(Duration::from_millis(config.timing.tick_millis))?;
        SessionRunner::new(engine, ticks, clock)
            .run(&candidate)
            .await?
    } else {
        let ticks = SyntheticTicks::new(config.timing.tick_millis);
        SessionRunner::new(engine, ticks, clock)
            .run(&candidate)
            .await?
    };

    eprintln!("\n{}", band_table(&report));
    let zeros = auto_zero_lines(&report);
    if !zeros.is_empty() {
        eprintln!("\nAuto-zero:");
        for line in zeros {
            eprintln!("{line}");
        }
    }

    std::fs::create_dir_all(&output)?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");

    for fmt in &formats {
        match *fmt {
            "json" => {
                let path = output.join(format!("report-{timestamp}.json"));
                report.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            "html" => {
                let path = output.join(format!("report-{timestamp}.html"));
                write_html_report(&report, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            _ => {}
        }
    }

    Ok(())
}
