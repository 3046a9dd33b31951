pub mod compare;
pub mod consent;
pub mod init;
pub mod show;
pub mod simulate;
pub mod validate;

use comfy_table::{Cell, Table};

use bandscore_core::model::Section;
use bandscore_core::report::SessionReport;

/// Section bands of one attempt, with an overall row.
pub(crate) fn band_table(report: &SessionReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Section", "Items", "Points", "Band"]);

    for section in Section::ALL {
        let score = report.aggregate.section(section);
        if score.item_count == 0 {
            table.add_row(vec![
                Cell::new(section),
                Cell::new(0),
                Cell::new("-"),
                Cell::new("-"),
            ]);
            continue;
        }
        table.add_row(vec![
            Cell::new(section),
            Cell::new(score.item_count),
            Cell::new(format!("{} / {}", score.achieved, score.max)),
            Cell::new(score.band),
        ]);
    }
    table.add_row(vec![
        Cell::new("overall"),
        Cell::new(report.aggregate.item_count()),
        Cell::new(format!(
            "{} / {}",
            report.aggregate.achieved, report.aggregate.max
        )),
        Cell::new(report.aggregate.overall),
    ]);
    table
}

/// One-line lines for every auto-zeroed item.
pub(crate) fn auto_zero_lines(report: &SessionReport) -> Vec<String> {
    report
        .auto_zeros()
        .map(|r| {
            let reason = r
                .zero_reason
                .as_ref()
                .map(|z| z.to_string())
                .unwrap_or_default();
            format!("  {} ({}): {reason}", r.item_id, r.kind)
        })
        .collect()
}
