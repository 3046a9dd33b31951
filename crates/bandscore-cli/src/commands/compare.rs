//! The `bandscore compare` command.

use std::path::PathBuf;

use anyhow::Result;

use bandscore_core::report::SessionReport;
use bandscore_report::write_progress_html;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: u32,
    fail_on_decline: bool,
    format: String,
    html: Option<PathBuf>,
) -> Result<()> {
    let baseline = SessionReport::load_json(&baseline_path)?;
    let current = SessionReport::load_json(&current_path)?;

    let progress = current.compare(&baseline, threshold);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", progress.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        _ => {
            // text format
            println!(
                "Overall band: {} -> {} ({:+})",
                progress.overall.baseline, progress.overall.current, progress.overall.delta
            );
            println!(
                "Comparison: {} improved, {} declined, {} unchanged",
                progress.improvements().count(),
                progress.declines().count(),
                progress.sections.len()
                    - progress.improvements().count()
                    - progress.declines().count()
            );

            let declines: Vec<_> = progress.declines().collect();
            if !declines.is_empty() {
                println!("\nDeclines:");
                for d in declines {
                    println!("  {} {} -> {} ({:+})", d.label, d.baseline, d.current, d.delta);
                }
            }

            let improvements: Vec<_> = progress.improvements().collect();
            if !improvements.is_empty() {
                println!("\nImprovements:");
                for d in improvements {
                    println!("  {} {} -> {} ({:+})", d.label, d.baseline, d.current, d.delta);
                }
            }
        }
    }

    if let Some(path) = html {
        write_progress_html(&progress, &path)?;
        eprintln!("HTML comparison: {}", path.display());
    }

    if fail_on_decline && progress.has_declines() {
        std::process::exit(1);
    }

    Ok(())
}
