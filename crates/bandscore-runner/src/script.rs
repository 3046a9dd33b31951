//! Scripted candidates: what a simulated test taker does, loaded from TOML.
//!
//! ```toml
//! [candidate]
//! name = "Ada Lovelace"
//! intro_secs = 12
//! dwell_secs = 5
//!
//! [answers.mcs-1]
//! text = "B"
//!
//! [answers.rl-1]
//! spoken_secs = 30
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use bandscore_core::model::{CandidateInfo, Item, Response, ResponseShape, ScoringFamily};

/// One scripted answer. Exactly one field is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptedAnswer {
    /// Free text, or the single option selected.
    #[serde(default)]
    pub text: Option<String>,
    /// Options selected, or paragraph order.
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    /// Words typed into the blanks, in blank order.
    #[serde(default)]
    pub blanks: Option<Vec<String>>,
    /// Seconds spent speaking once the recording window opens.
    #[serde(default)]
    pub spoken_secs: Option<u32>,
}

/// What the candidate does with one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Respond(Response),
    FillBlanks(Vec<String>),
    Speak(u32),
    /// Leave the item unanswered.
    Skip,
}

impl ScriptedAnswer {
    fn action(&self) -> Action {
        if let Some(secs) = self.spoken_secs {
            Action::Speak(secs)
        } else if let Some(blanks) = &self.blanks {
            Action::FillBlanks(blanks.clone())
        } else if let Some(choices) = &self.choices {
            Action::Respond(Response::Choices(choices.clone()))
        } else if let Some(text) = &self.text {
            Action::Respond(Response::Text(text.clone()))
        } else {
            Action::Skip
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateProfile {
    pub name: String,
    pub email: Option<String>,
    pub candidate_id: Option<String>,
    /// Acknowledge the disclaimer on screen. Without it the run relies on
    /// consent already on file.
    pub acknowledge_disclaimer: bool,
    /// Length of the introduction recording.
    pub intro_secs: u32,
    /// Ticks spent reading an item before answering it.
    pub dwell_secs: u32,
    /// Wait for unanswered items to time out instead of moving on.
    pub wait_on_unanswered: bool,
    /// Answer closed-form items without a scripted answer from their key.
    pub use_answer_key: bool,
}

impl Default for CandidateProfile {
    fn default() -> Self {
        Self {
            name: "Practice Candidate".to_string(),
            email: None,
            candidate_id: None,
            acknowledge_disclaimer: true,
            intro_secs: 10,
            dwell_secs: 2,
            wait_on_unanswered: false,
            use_answer_key: false,
        }
    }
}

/// A complete candidate script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptedCandidate {
    pub candidate: CandidateProfile,
    /// Answers keyed by item id.
    pub answers: BTreeMap<String, ScriptedAnswer>,
}

impl ScriptedCandidate {
    /// Load a script from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse script: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// A candidate that answers every closed-form item correctly and speaks
    /// for `spoken_secs` on spoken items.
    pub fn answer_key(spoken_secs: u32) -> Self {
        Self {
            candidate: CandidateProfile {
                use_answer_key: true,
                ..CandidateProfile::default()
            },
            answers: BTreeMap::new(),
        }
        .with_default_speech(spoken_secs)
    }

    fn with_default_speech(mut self, secs: u32) -> Self {
        self.answers.insert(
            DEFAULT_SPOKEN_KEY.to_string(),
            ScriptedAnswer {
                spoken_secs: Some(secs),
                ..ScriptedAnswer::default()
            },
        );
        self
    }

    pub fn candidate_info(&self) -> CandidateInfo {
        CandidateInfo {
            name: self.candidate.name.clone(),
            email: self.candidate.email.clone(),
            candidate_id: self.candidate.candidate_id.clone(),
        }
    }

    /// Decide what to do with `item`.
    pub fn action_for(&self, item: &Item) -> Action {
        if let Some(answer) = self.answers.get(&item.id) {
            return answer.action();
        }
        if item.kind.is_spoken() {
            if let Some(answer) = self.answers.get(DEFAULT_SPOKEN_KEY) {
                return answer.action();
            }
        }
        if self.candidate.use_answer_key {
            return key_action(item);
        }
        Action::Skip
    }
}

/// Answer entry applied to every spoken item without its own answer.
pub const DEFAULT_SPOKEN_KEY: &str = "*spoken";

fn key_action(item: &Item) -> Action {
    if item.kind.scoring_family() != ScoringFamily::ClosedForm || item.answer.is_empty() {
        return Action::Skip;
    }
    match item.kind.response_shape() {
        ResponseShape::Text => Action::Respond(Response::Text(item.answer[0].clone())),
        ResponseShape::Choices => Action::Respond(Response::Choices(item.answer.clone())),
        ResponseShape::Blanks => Action::FillBlanks(item.answer.clone()),
        ResponseShape::Audio => Action::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandscore_core::model::ItemKind;

    const SCRIPT: &str = r#"
[candidate]
name = "Ada Lovelace"
email = "ada@example.com"
intro_secs = 12
wait_on_unanswered = true

[answers.mcs-1]
text = "B"

[answers.mcm-1]
choices = ["A", "C"]

[answers.rfib-1]
blanks = ["river", "bank"]

[answers.rl-1]
spoken_secs = 30
"#;

    #[test]
    fn parse_script() {
        let script = ScriptedCandidate::parse(SCRIPT).unwrap();
        assert_eq!(script.candidate.name, "Ada Lovelace");
        assert_eq!(script.candidate.intro_secs, 12);
        // unset profile fields keep defaults
        assert_eq!(script.candidate.dwell_secs, 2);
        assert!(script.candidate.wait_on_unanswered);
        assert_eq!(script.answers.len(), 4);
        assert_eq!(
            script.candidate_info().email.as_deref(),
            Some("ada@example.com")
        );
    }

    #[test]
    fn answers_become_actions() {
        let script = ScriptedCandidate::parse(SCRIPT).unwrap();
        let mcs = Item::new("mcs-1", ItemKind::MultipleChoiceSingle, "Pick");
        let mcm = Item::new("mcm-1", ItemKind::MultipleChoiceMultiple, "Pick");
        let rfib = Item::new("rfib-1", ItemKind::ReadingFillInBlanks, "Fill");
        let rl = Item::new("rl-1", ItemKind::RetellLecture, "Retell");
        let we = Item::new("we-1", ItemKind::WriteEssay, "Discuss");

        assert_eq!(script.action_for(&mcs), Action::Respond(Response::text("B")));
        assert_eq!(
            script.action_for(&mcm),
            Action::Respond(Response::choices(["A", "C"]))
        );
        assert_eq!(
            script.action_for(&rfib),
            Action::FillBlanks(vec!["river".into(), "bank".into()])
        );
        assert_eq!(script.action_for(&rl), Action::Speak(30));
        assert_eq!(script.action_for(&we), Action::Skip);
    }

    #[test]
    fn answer_key_candidate() {
        let script = ScriptedCandidate::answer_key(8);
        let mcs = Item::new("mcs-9", ItemKind::MultipleChoiceSingle, "Pick")
            .with_options(["A", "B"])
            .with_answer(["A"]);
        let lfib = Item::new("lfib-9", ItemKind::ListeningFillInBlanks, "Fill")
            .with_answer(["one", "two"]);
        let rs = Item::new("rs-9", ItemKind::RepeatSentence, "Repeat");
        let sst = Item::new("sst-9", ItemKind::SummarizeSpokenText, "Summarize");

        assert_eq!(script.action_for(&mcs), Action::Respond(Response::text("A")));
        assert_eq!(
            script.action_for(&lfib),
            Action::FillBlanks(vec!["one".into(), "two".into()])
        );
        assert_eq!(script.action_for(&rs), Action::Speak(8));
        assert_eq!(script.action_for(&sst), Action::Skip);
    }

    #[test]
    fn unknown_answer_field_is_rejected() {
        let err = ScriptedCandidate::parse("[answers.x]\nspoken = 3\n").unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScriptedCandidate::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read script"));
    }
}
