//! Session report with JSON persistence and retake comparison.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AudioResponse, CandidateInfo, Item, ScoreResult, Section};
use crate::session::Advisory;
use crate::statistics::AggregatedScore;

/// Everything a finished attempt produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Test session identifier.
    pub session_id: Uuid,
    /// When scoring ran.
    pub created_at: DateTime<Utc>,
    /// When the active phase began.
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub candidate: Option<CandidateInfo>,
    /// The items presented, in order.
    pub items: Vec<Item>,
    /// One result per item, in item order.
    pub results: Vec<ScoreResult>,
    pub aggregate: AggregatedScore,
    /// Non-blocking notices raised during the attempt.
    #[serde(default)]
    pub advisories: Vec<Advisory>,
    /// The unscored introduction recording.
    #[serde(default)]
    pub intro_recording: Option<AudioResponse>,
}

impl SessionReport {
    /// Save the report as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: SessionReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Results that were forced to zero by a constraint or capture rule.
    pub fn auto_zeros(&self) -> impl Iterator<Item = &ScoreResult> {
        self.results.iter().filter(|r| r.auto_zero)
    }

    /// Band changes from `baseline` to this attempt.
    ///
    /// Changes smaller than `threshold` band points count as unchanged.
    pub fn compare(&self, baseline: &SessionReport, threshold: u32) -> ProgressReport {
        let mut sections = Vec::new();
        for section in Section::ALL {
            let before = baseline.aggregate.section(section);
            let after = self.aggregate.section(section);
            if before.item_count == 0 && after.item_count == 0 {
                continue;
            }
            sections.push(BandDelta::new(
                section.to_string(),
                before.band,
                after.band,
                threshold,
            ));
        }

        ProgressReport {
            baseline_session: baseline.session_id,
            current_session: self.session_id,
            sections,
            overall: BandDelta::new(
                "overall".to_string(),
                baseline.aggregate.overall,
                self.aggregate.overall,
                threshold,
            ),
        }
    }
}

/// Whether a band moved meaningfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improved,
    Declined,
    Unchanged,
}

/// One band before and after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandDelta {
    /// Section name, or `overall`.
    pub label: String,
    pub baseline: u32,
    pub current: u32,
    pub delta: i64,
    pub trend: Trend,
}

impl BandDelta {
    fn new(label: String, baseline: u32, current: u32, threshold: u32) -> Self {
        let delta = current as i64 - baseline as i64;
        let trend = if delta > threshold as i64 {
            Trend::Improved
        } else if delta < -(threshold as i64) {
            Trend::Declined
        } else {
            Trend::Unchanged
        };
        Self {
            label,
            baseline,
            current,
            delta,
            trend,
        }
    }
}

/// Result of comparing two attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub baseline_session: Uuid,
    pub current_session: Uuid,
    /// Sections attempted in either report, in test order.
    pub sections: Vec<BandDelta>,
    pub overall: BandDelta,
}

impl ProgressReport {
    pub fn improvements(&self) -> impl Iterator<Item = &BandDelta> {
        self.sections.iter().filter(|d| d.trend == Trend::Improved)
    }

    pub fn declines(&self) -> impl Iterator<Item = &BandDelta> {
        self.sections.iter().filter(|d| d.trend == Trend::Declined)
    }

    /// Returns true if any section or the overall band went down.
    pub fn has_declines(&self) -> bool {
        self.overall.trend == Trend::Declined || self.declines().next().is_some()
    }

    /// Format the comparison as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** overall {} -> {} ({:+}), {} improved, {} declined\n\n",
            self.overall.baseline,
            self.overall.current,
            self.overall.delta,
            self.improvements().count(),
            self.declines().count()
        ));

        md.push_str("| Section | Baseline | Current | Delta |\n");
        md.push_str("|---------|----------|---------|-------|\n");
        for d in self.sections.iter().chain(std::iter::once(&self.overall)) {
            md.push_str(&format!(
                "| {} | {} | {} | {:+} |\n",
                d.label, d.baseline, d.current, d.delta
            ));
        }

        md
    }
}
