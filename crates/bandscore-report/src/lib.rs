//! bandscore-report — Report rendering.
//!
//! Renders session reports and retake comparisons as self-contained HTML.

pub mod html;

pub use html::{generate_html, generate_progress_html, write_html_report, write_progress_html};
