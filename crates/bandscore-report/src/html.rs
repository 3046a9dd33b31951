//! HTML report generator.
//!
//! Produces self-contained HTML files with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use bandscore_core::model::Section;
use bandscore_core::report::{ProgressReport, SessionReport, Trend};
use bandscore_core::statistics::{AggregatedScore, BAND_CEILING};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn page_start(html: &mut String, title: &str) {
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", html_escape(title)));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");
}

fn page_end(html: &mut String) {
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");
    html.push_str("</body>\n</html>");
}

/// Generate an HTML report for one attempt.
pub fn generate_html(report: &SessionReport) -> String {
    let mut html = String::new();
    let candidate = report
        .candidate
        .as_ref()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    page_start(&mut html, &format!("bandscore report — {candidate}"));

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>bandscore report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Candidate: <strong>{}</strong> | {} items | session {} | {}</p>\n",
        html_escape(&candidate),
        report.results.len(),
        report.session_id,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str(&format!(
        "<p class=\"overall\">Overall band <strong>{}</strong> ({} / {} points)</p>\n",
        report.aggregate.overall, report.aggregate.achieved, report.aggregate.max
    ));
    html.push_str("</header>\n");

    // Section dashboard
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Sections</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str(
        "<thead><tr><th>Section</th><th>Items</th><th>Points</th><th>Band</th></tr></thead>\n",
    );
    html.push_str("<tbody>\n");
    for section in Section::ALL {
        let score = report.aggregate.section(section);
        if score.item_count == 0 {
            html.push_str(&format!(
                "<tr class=\"absent\"><td>{section}</td><td>0</td><td>-</td><td>-</td></tr>\n"
            ));
            continue;
        }
        html.push_str(&format!(
            "<tr><td>{section}</td><td>{}</td><td>{} / {}</td><td>{}</td></tr>\n",
            score.item_count, score.achieved, score.max, score.band
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str(&generate_band_chart(&report.aggregate));
    html.push_str("</section>\n");

    // Spoken sub-skills
    let skills = &report.aggregate.sub_skills;
    if skills.spoken_items > 0 {
        html.push_str("<section class=\"sub-skills\">\n");
        html.push_str("<h2>Speaking sub-skills</h2>\n");
        html.push_str(&format!(
            "<p class=\"meta\">Averaged over {} spoken items, each out of 5.</p>\n",
            skills.spoken_items
        ));
        html.push_str("<table><thead><tr><th>Fluency</th><th>Pronunciation</th><th>Content</th></tr></thead>\n");
        html.push_str(&format!(
            "<tbody><tr><td>{:.1}</td><td>{:.1}</td><td>{:.1}</td></tr></tbody></table>\n",
            skills.fluency, skills.pronunciation, skills.content
        ));
        html.push_str("</section>\n");
    }

    // Advisories
    if !report.advisories.is_empty() {
        html.push_str("<section class=\"advisories\">\n");
        html.push_str("<h2>Advisories</h2>\n<ul>\n");
        for advisory in &report.advisories {
            html.push_str(&format!(
                "<li>{}</li>\n",
                html_escape(&advisory.to_string())
            ));
        }
        html.push_str("</ul>\n</section>\n");
    }

    // Per-item results
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Items</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">#</th><th onclick=\"sortTable(1)\">Item</th><th onclick=\"sortTable(2)\">Kind</th><th onclick=\"sortTable(3)\">Section</th><th onclick=\"sortTable(4)\">Score</th><th>Note</th></tr></thead>\n");
    html.push_str("<tbody>\n");

    for (i, r) in report.results.iter().enumerate() {
        let row_class = if r.auto_zero {
            "fail"
        } else if r.score == r.max {
            "pass"
        } else {
            ""
        };
        let note = r
            .zero_reason
            .as_ref()
            .map(|z| html_escape(&z.to_string()))
            .unwrap_or_default();

        html.push_str(&format!(
            "<tr class=\"{row_class}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{} / {}</td><td>{note}</td></tr>\n",
            i + 1,
            html_escape(&r.item_id),
            r.kind,
            r.section,
            r.score,
            r.max,
        ));
    }

    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(
        &serde_json::to_string_pretty(report)
            .unwrap_or_default()
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    );
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    page_end(&mut html);
    html
}

/// Generate an HTML page comparing a retake against its baseline.
pub fn generate_progress_html(progress: &ProgressReport) -> String {
    let mut html = String::new();
    page_start(&mut html, "bandscore progress");

    html.push_str("<header>\n<h1>bandscore progress</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Baseline {} | Current {}</p>\n",
        progress.baseline_session, progress.current_session
    ));
    html.push_str(&format!(
        "<p class=\"overall\">Overall band {} &rarr; <strong>{}</strong> ({:+})</p>\n",
        progress.overall.baseline, progress.overall.current, progress.overall.delta
    ));
    html.push_str("</header>\n");

    html.push_str("<section class=\"results\">\n");
    html.push_str("<table id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">Section</th><th>Baseline</th><th>Current</th><th onclick=\"sortTable(3)\">Delta</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for d in progress.sections.iter().chain(std::iter::once(&progress.overall)) {
        let class = match d.trend {
            Trend::Improved => "pass",
            Trend::Declined => "fail",
            Trend::Unchanged => "",
        };
        html.push_str(&format!(
            "<tr class=\"{class}\"><td>{}</td><td>{}</td><td>{}</td><td>{:+}</td></tr>\n",
            html_escape(&d.label),
            d.baseline,
            d.current,
            d.delta
        ));
    }
    html.push_str("</tbody></table>\n</section>\n");

    page_end(&mut html);
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &SessionReport, path: &Path) -> Result<()> {
    write_page(&generate_html(report), path)
}

/// Write a progress comparison to a file.
pub fn write_progress_html(progress: &ProgressReport, path: &Path) -> Result<()> {
    write_page(&generate_progress_html(progress), path)
}

fn write_page(html: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn generate_band_chart(aggregate: &AggregatedScore) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 120;

    let mut bands: Vec<(String, u32)> = Section::ALL
        .iter()
        .map(|s| (s.to_string(), aggregate.section(*s)))
        .filter(|(_, score)| score.item_count > 0)
        .map(|(label, score)| (label, score.band))
        .collect();
    bands.push(("overall".to_string(), aggregate.overall));

    let total_height = bands.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, (label, band)) in bands.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = (*band as usize * max_width) / BAND_CEILING as usize;

        let color = if *band >= 65 {
            "#22c55e"
        } else if *band >= 45 {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(label)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            band
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.overall { font-size: 1.25rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.absent { color: #9ca3af; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    return asc ? va.localeCompare(vb, undefined, {numeric: true}) : vb.localeCompare(va, undefined, {numeric: true});
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
