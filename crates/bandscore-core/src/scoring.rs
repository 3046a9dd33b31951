//! Per-item scoring strategies and the pipeline that dispatches to them.
//!
//! Closed-form kinds are all-or-nothing against the canonical answer.
//! Free-text kinds are checked against hard constraints and then given a
//! fixed fraction of credit. Spoken kinds are judged from recording
//! duration, since no acoustic analysis is performed.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{
    Item, ItemKind, Response, ScoreResult, ScoringFamily, Section, SubSkills, ZeroReason,
};
use crate::responses::ResponseStore;

/// Denominator for the three spoken sub-skills, each capped at 5.
pub const SPOKEN_COMBINED_MAX: u32 = 15;

/// Scoring knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Recordings smaller than this are treated as silence.
    pub min_audio_bytes: u64,
    /// Share of the maximum awarded to free text that meets its constraints.
    pub partial_credit: f64,
    pub grammar: GrammarConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_audio_bytes: 1024,
            partial_credit: 0.75,
            grammar: GrammarConfig::default(),
        }
    }
}

/// Which grammar check essays go through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum GrammarConfig {
    #[default]
    Lenient,
    /// Simulated grammar errors with a fixed probability.
    Sampled {
        error_probability: f64,
        #[serde(default)]
        seed: u64,
    },
}

impl GrammarConfig {
    pub fn build(&self) -> Arc<dyn GrammarCheck> {
        match self {
            GrammarConfig::Lenient => Arc::new(AcceptAll),
            GrammarConfig::Sampled {
                error_probability,
                seed,
            } => Arc::new(SampledErrors::new(*error_probability, *seed)),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy traits
// ---------------------------------------------------------------------------

/// Scores one item. `response` is `None` when the candidate never answered.
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn score(&self, item: &Item, response: Option<&Response>) -> ScoreResult;
}

/// Stand-in for a full linguistic evaluation of free text.
pub trait GrammarCheck: Send + Sync {
    fn name(&self) -> &str;

    /// `false` forces the response to zero.
    fn passes(&self, item: &Item, text: &str) -> bool;
}

/// Never rejects.
pub struct AcceptAll;

impl GrammarCheck for AcceptAll {
    fn name(&self) -> &str {
        "accept-all"
    }

    fn passes(&self, _: &Item, _: &str) -> bool {
        true
    }
}

/// Rejects with a fixed probability.
///
/// Each draw is seeded from the item id and the text, so re-scoring the same
/// response always gives the same verdict.
pub struct SampledErrors {
    error_probability: f64,
    seed: u64,
}

impl SampledErrors {
    pub fn new(error_probability: f64, seed: u64) -> Self {
        Self {
            error_probability: error_probability.clamp(0.0, 1.0),
            seed,
        }
    }
}

impl GrammarCheck for SampledErrors {
    fn name(&self) -> &str {
        "sampled-errors"
    }

    fn passes(&self, item: &Item, text: &str) -> bool {
        // top 53 bits as a uniform draw in [0, 1)
        let draw = (verdict_hash(self.seed, &item.id, text) >> 11) as f64 / (1u64 << 53) as f64;
        draw >= self.error_probability
    }
}

/// FNV-1a over the seed, item id and text. Fixed so saved reports re-score
/// the same on any toolchain.
fn verdict_hash(seed: u64, item_id: &str, text: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    seed.to_le_bytes()
        .iter()
        .chain(item_id.as_bytes())
        .chain(&[0u8])
        .chain(text.as_bytes())
        .fold(OFFSET, |h, &b| (h ^ b as u64).wrapping_mul(PRIME))
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Collapse whitespace and lowercase for answer comparison.
pub fn normalize_answer(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Sentences are runs of text ended by `.`, `!` or `?` (or the end of input).
pub fn count_sentences(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
}

fn sorted_join(values: &[String]) -> String {
    let mut normalized: Vec<String> = values.iter().map(|v| normalize_answer(v)).collect();
    normalized.sort();
    normalized.join("|")
}

// ---------------------------------------------------------------------------
// Closed-form
// ---------------------------------------------------------------------------

/// Full credit for an exact match with the canonical answer, else zero.
pub struct ExactMatch;

impl ExactMatch {
    fn matches(item: &Item, response: &Response) -> bool {
        if item.answer.is_empty() {
            return false;
        }
        match response {
            Response::Text(text) => {
                item.answer.len() == 1 && normalize_answer(text) == normalize_answer(&item.answer[0])
            }
            Response::Choices(choices) if item.kind.order_sensitive() => {
                choices.len() == item.answer.len()
                    && choices
                        .iter()
                        .zip(&item.answer)
                        .all(|(c, a)| normalize_answer(c) == normalize_answer(a))
            }
            Response::Choices(choices) => sorted_join(choices) == sorted_join(&item.answer),
            Response::Blanks(blanks) => item.answer.iter().enumerate().all(|(i, expected)| {
                blanks
                    .get(&i)
                    .is_some_and(|given| normalize_answer(given) == normalize_answer(expected))
            }),
            Response::Audio(_) => false,
        }
    }
}

impl ScoringStrategy for ExactMatch {
    fn name(&self) -> &str {
        "exact-match"
    }

    fn score(&self, item: &Item, response: Option<&Response>) -> ScoreResult {
        match response {
            None => ScoreResult::zero(item, ZeroReason::NoResponse),
            Some(r) if Self::matches(item, r) => ScoreResult::new(item, item.max_score),
            Some(_) => ScoreResult::zero(item, ZeroReason::Incorrect),
        }
    }
}

// ---------------------------------------------------------------------------
// Constrained free text
// ---------------------------------------------------------------------------

/// Hard sentence/word constraints, a grammar check, then partial credit.
pub struct ConstrainedText {
    partial_credit: f64,
    grammar: Arc<dyn GrammarCheck>,
}

impl ConstrainedText {
    pub fn new(partial_credit: f64, grammar: Arc<dyn GrammarCheck>) -> Self {
        Self {
            partial_credit: partial_credit.clamp(0.0, 1.0),
            grammar,
        }
    }

    /// The first violated constraint, if any.
    pub fn violation(item: &Item, text: &str) -> Option<ZeroReason> {
        let constraints = item.effective_constraints()?;
        if let Some(expected) = constraints.sentences {
            let found = count_sentences(text);
            if found != expected {
                return Some(ZeroReason::SentenceCount { found, expected });
            }
        }
        let words = count_words(text);
        if words < constraints.min_words || words > constraints.max_words {
            return Some(ZeroReason::WordCount {
                found: words,
                min: constraints.min_words,
                max: constraints.max_words,
            });
        }
        None
    }
}

impl ScoringStrategy for ConstrainedText {
    fn name(&self) -> &str {
        "constrained-text"
    }

    fn score(&self, item: &Item, response: Option<&Response>) -> ScoreResult {
        let text = match response {
            Some(Response::Text(text)) if !text.trim().is_empty() => text,
            Some(Response::Text(_)) | None => {
                return ScoreResult::zero(item, ZeroReason::NoResponse)
            }
            Some(_) => return ScoreResult::zero(item, ZeroReason::ShapeMismatch),
        };

        if let Some(reason) = Self::violation(item, text) {
            return ScoreResult::zero(item, reason);
        }

        if item.kind == ItemKind::WriteEssay && !self.grammar.passes(item, text) {
            tracing::debug!(item = %item.id, check = self.grammar.name(), "grammar check failed");
            return ScoreResult::zero(item, ZeroReason::GrammarCheck);
        }

        let score = (item.max_score as f64 * self.partial_credit).round() as u32;
        ScoreResult::new(item, score)
    }
}

// ---------------------------------------------------------------------------
// Spoken
// ---------------------------------------------------------------------------

/// Sub-skills approximated from how long the candidate spoke.
pub fn derive_sub_skills(duration_secs: u32) -> SubSkills {
    let fluency = match duration_secs {
        30.. => 5,
        20..=29 => 4,
        10..=19 => 3,
        5..=9 => 2,
        1..=4 => 1,
        0 => 0,
    };
    SubSkills {
        fluency,
        pronunciation: fluency.saturating_sub(1),
        content: (duration_secs / 3).min(5),
    }
}

/// Duration-based scoring for spoken kinds.
pub struct SpokenDuration {
    min_audio_bytes: u64,
}

impl SpokenDuration {
    pub fn new(min_audio_bytes: u64) -> Self {
        Self { min_audio_bytes }
    }
}

impl ScoringStrategy for SpokenDuration {
    fn name(&self) -> &str {
        "spoken-duration"
    }

    fn score(&self, item: &Item, response: Option<&Response>) -> ScoreResult {
        let zero = |reason| ScoreResult::zero(item, reason).with_sub_skills(SubSkills::default());

        let audio = match response {
            Some(Response::Audio(audio)) => audio,
            None => return zero(ZeroReason::NoAudioCaptured),
            Some(_) => return zero(ZeroReason::ShapeMismatch),
        };
        if !audio.captured {
            return zero(ZeroReason::NoAudioCaptured);
        }
        if audio.duration_secs == 0 {
            return zero(ZeroReason::NoDuration);
        }
        let byte_size = audio.handle.as_ref().map(|h| h.byte_size).unwrap_or(0);
        if byte_size < self.min_audio_bytes {
            return zero(ZeroReason::AudioTooSmall {
                byte_size,
                minimum: self.min_audio_bytes,
            });
        }

        let skills = derive_sub_skills(audio.duration_secs);
        let score = (skills.combined() as f64 / SPOKEN_COMBINED_MAX as f64
            * item.max_score as f64)
            .round() as u32;
        ScoreResult::new(item, score).with_sub_skills(skills)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Routes each item to its strategy, by section and then by kind.
#[derive(Clone)]
pub struct ScoringPipeline {
    closed_form: Arc<dyn ScoringStrategy>,
    free_text: Arc<dyn ScoringStrategy>,
    spoken: Arc<dyn ScoringStrategy>,
    overrides: HashMap<ItemKind, Arc<dyn ScoringStrategy>>,
}

impl ScoringPipeline {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            closed_form: Arc::new(ExactMatch),
            free_text: Arc::new(ConstrainedText::new(
                config.partial_credit,
                config.grammar.build(),
            )),
            spoken: Arc::new(SpokenDuration::new(config.min_audio_bytes)),
            overrides: HashMap::new(),
        }
    }

    /// Replace the strategy used for one kind.
    pub fn with_strategy(mut self, kind: ItemKind, strategy: Arc<dyn ScoringStrategy>) -> Self {
        self.overrides.insert(kind, strategy);
        self
    }

    pub fn strategy_for(&self, item: &Item) -> &dyn ScoringStrategy {
        if let Some(strategy) = self.overrides.get(&item.kind) {
            return strategy.as_ref();
        }
        let strategy = match item.section {
            Section::Speaking => &self.spoken,
            Section::Writing => &self.free_text,
            Section::Reading | Section::Listening => match item.kind.scoring_family() {
                ScoringFamily::ConstrainedText => &self.free_text,
                ScoringFamily::Spoken => &self.spoken,
                ScoringFamily::ClosedForm => &self.closed_form,
            },
        };
        strategy.as_ref()
    }

    /// Score one item; the result is always within `0..=max`.
    pub fn score_item(&self, item: &Item, response: Option<&Response>) -> ScoreResult {
        let mut result = self.strategy_for(item).score(item, response);
        result.max = item.max_score;
        result.score = result.score.min(item.max_score);
        result
    }

    /// One result per item, in item order.
    pub fn score_all(&self, items: &[Item], responses: &ResponseStore) -> Vec<ScoreResult> {
        items
            .iter()
            .map(|item| self.score_item(item, responses.get(&item.id)))
            .collect()
    }
}

impl Default for ScoringPipeline {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}
