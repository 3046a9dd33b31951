//! Section and overall band aggregation.
//!
//! Bands are always recomputed from the full result set, never updated
//! incrementally.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{ScoreResult, Section, SubSkills};

/// Lowest band awarded to a section that was attempted.
pub const BAND_FLOOR: u32 = 10;
/// Highest band.
pub const BAND_CEILING: u32 = 90;

/// Map `achieved / max` linearly onto the 10-90 band.
///
/// A zero maximum yields the floor.
pub fn normalize_band(achieved: u32, max: u32) -> u32 {
    if max == 0 {
        return BAND_FLOOR;
    }
    let ratio = (achieved.min(max)) as f64 / max as f64;
    (BAND_FLOOR as f64 + ratio * (BAND_CEILING - BAND_FLOOR) as f64).round() as u32
}

/// Totals for one section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionScore {
    pub item_count: usize,
    pub achieved: u32,
    pub max: u32,
    /// 10-90, or 0 when the section had no items.
    pub band: u32,
}

/// Averages of the spoken sub-skills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubSkillSummary {
    pub fluency: f64,
    pub pronunciation: f64,
    pub content: f64,
    /// Number of spoken items averaged over.
    pub spoken_items: usize,
}

/// Per-section and overall bands for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedScore {
    /// Every section, present or not.
    pub sections: BTreeMap<Section, SectionScore>,
    pub overall: u32,
    pub achieved: u32,
    pub max: u32,
    pub sub_skills: SubSkillSummary,
}

impl AggregatedScore {
    pub fn section(&self, section: Section) -> SectionScore {
        self.sections.get(&section).copied().unwrap_or_default()
    }

    /// Number of scored items across all sections.
    pub fn item_count(&self) -> usize {
        self.sections.values().map(|s| s.item_count).sum()
    }
}

/// Aggregate a full result set.
pub fn aggregate(results: &[ScoreResult]) -> AggregatedScore {
    let mut sections: BTreeMap<Section, SectionScore> = Section::ALL
        .iter()
        .map(|s| (*s, SectionScore::default()))
        .collect();

    for result in results {
        let entry = sections.entry(result.section).or_default();
        entry.item_count += 1;
        entry.achieved += result.score.min(result.max);
        entry.max += result.max;
    }
    for score in sections.values_mut() {
        if score.item_count > 0 {
            score.band = normalize_band(score.achieved, score.max);
        }
    }

    let achieved = sections.values().map(|s| s.achieved).sum();
    let max = sections.values().map(|s| s.max).sum();
    let overall = normalize_band(achieved, max);

    AggregatedScore {
        sections,
        overall,
        achieved,
        max,
        sub_skills: summarize_sub_skills(results),
    }
}

/// Average sub-skills over spoken items. Spoken items forced to zero count
/// as zeros.
pub fn summarize_sub_skills(results: &[ScoreResult]) -> SubSkillSummary {
    let spoken: Vec<_> = results
        .iter()
        .filter(|r| r.kind.is_spoken())
        .map(|r| r.sub_skills.unwrap_or_default())
        .collect();
    if spoken.is_empty() {
        return SubSkillSummary::default();
    }

    let n = spoken.len() as f64;
    let mean = |f: fn(&SubSkills) -> u32| {
        spoken.iter().map(|s| f(s) as f64).sum::<f64>() / n
    };
    SubSkillSummary {
        fluency: mean(|s| s.fluency),
        pronunciation: mean(|s| s.pronunciation),
        content: mean(|s| s.content),
        spoken_items: spoken.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, ItemKind, ZeroReason};

    #[test]
    fn band_endpoints() {
        assert_eq!(normalize_band(0, 0), 10);
        assert_eq!(normalize_band(50, 100), 50);
        assert_eq!(normalize_band(0, 7), 10);
        assert_eq!(normalize_band(7, 7), 90);
        // 10 + 1/3 * 80 = 36.67
        assert_eq!(normalize_band(1, 3), 37);
    }

    #[test]
    fn absent_sections_report_zero() {
        let item = Item::new("mcs-1", ItemKind::MultipleChoiceSingle, "Pick");
        let agg = aggregate(&[ScoreResult::new(&item, 1)]);
        assert_eq!(agg.sections.len(), 4);
        assert_eq!(agg.section(Section::Reading).band, 90);
        assert_eq!(agg.section(Section::Speaking).band, 0);
        assert_eq!(agg.section(Section::Speaking).item_count, 0);
        assert_eq!(agg.overall, 90);
    }

    #[test]
    fn overall_uses_pooled_totals() {
        let rs = Item::new("rs-1", ItemKind::RepeatSentence, "Repeat").with_max_score(10);
        let mcs = Item::new("mcs-1", ItemKind::MultipleChoiceSingle, "Pick").with_max_score(2);
        let results = vec![ScoreResult::new(&rs, 2), ScoreResult::new(&mcs, 2)];
        let agg = aggregate(&results);
        assert_eq!(agg.section(Section::Speaking).band, 26);
        assert_eq!(agg.section(Section::Reading).band, 90);
        // pooled 4/12, not the mean of section bands
        assert_eq!(agg.overall, 37);
        assert_eq!((agg.achieved, agg.max), (4, 12));
    }

    #[test]
    fn sub_skills_average_spoken_only() {
        let rs = Item::new("rs-1", ItemKind::RepeatSentence, "Repeat");
        let di = Item::new("di-1", ItemKind::DescribeImage, "Describe");
        let mcs = Item::new("mcs-1", ItemKind::MultipleChoiceSingle, "Pick");
        let results = vec![
            ScoreResult::new(&rs, 5).with_sub_skills(SubSkills {
                fluency: 4,
                pronunciation: 3,
                content: 5,
            }),
            ScoreResult::zero(&di, ZeroReason::NoAudioCaptured),
            ScoreResult::new(&mcs, 1),
        ];
        let summary = summarize_sub_skills(&results);
        assert_eq!(summary.spoken_items, 2);
        assert_eq!(summary.fluency, 2.0);
        assert_eq!(summary.pronunciation, 1.5);
        assert_eq!(summary.content, 2.5);
    }

    #[test]
    fn no_spoken_items_gives_zero_summary() {
        let item = Item::new("we-1", ItemKind::WriteEssay, "Discuss");
        let summary = summarize_sub_skills(&[ScoreResult::new(&item, 11)]);
        assert_eq!(summary, SubSkillSummary::default());
    }

    #[test]
    fn empty_results() {
        let agg = aggregate(&[]);
        // pooled (0, 0) takes the floor; only sections report 0 when absent
        assert_eq!(agg.overall, BAND_FLOOR);
        assert_eq!(agg.section(Section::Speaking).band, 0);
        assert_eq!(agg.item_count(), 0);
    }
}
