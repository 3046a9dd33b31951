//! The `bandscore show` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use bandscore_core::report::SessionReport;

use super::{auto_zero_lines, band_table};

pub fn execute(report_path: PathBuf, format: String) -> Result<()> {
    let report = SessionReport::load_json(&report_path)?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            let candidate = report
                .candidate
                .as_ref()
                .map(|c| c.name.as_str())
                .unwrap_or("anonymous");
            println!(
                "Session {} | {} | {}",
                report.session_id,
                candidate,
                report.created_at.format("%Y-%m-%d %H:%M UTC")
            );
            println!("Overall band: {}", report.aggregate.overall);
            println!("\n{}", band_table(&report));

            let skills = &report.aggregate.sub_skills;
            if skills.spoken_items > 0 {
                println!(
                    "\nSpeaking sub-skills over {} items: fluency {:.1}, pronunciation {:.1}, content {:.1}",
                    skills.spoken_items, skills.fluency, skills.pronunciation, skills.content
                );
            }

            let mut items = Table::new();
            items.set_header(vec!["#", "Item", "Kind", "Score"]);
            for (i, r) in report.results.iter().enumerate() {
                items.add_row(vec![
                    Cell::new(i + 1),
                    Cell::new(&r.item_id),
                    Cell::new(r.kind),
                    Cell::new(format!("{} / {}", r.score, r.max)),
                ]);
            }
            println!("\n{items}");

            let zeros = auto_zero_lines(&report);
            if !zeros.is_empty() {
                println!("\nAuto-zero:");
                for line in zeros {
                    println!("{line}");
                }
            }

            if !report.advisories.is_empty() {
                println!("\nAdvisories:");
                for advisory in &report.advisories {
                    println!("  {advisory}");
                }
            }
        }
    }

    Ok(())
}
