//! Core data model types for bandscore.
//!
//! These are the fundamental types the whole workspace uses to represent
//! exam items, candidate responses, and per-item score results.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the four skill categories used for score aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Speaking,
    Writing,
    Reading,
    Listening,
}

impl Section {
    /// All sections in the order they appear in a test.
    pub const ALL: [Section; 4] = [
        Section::Speaking,
        Section::Writing,
        Section::Reading,
        Section::Listening,
    ];
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Speaking => write!(f, "speaking"),
            Section::Writing => write!(f, "writing"),
            Section::Reading => write!(f, "reading"),
            Section::Listening => write!(f, "listening"),
        }
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "speaking" => Ok(Section::Speaking),
            "writing" => Ok(Section::Writing),
            "reading" => Ok(Section::Reading),
            "listening" => Ok(Section::Listening),
            other => Err(format!("unknown section: {other}")),
        }
    }
}

/// The task type of an item. The section is derived from the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    // Speaking
    ReadAloud,
    RepeatSentence,
    DescribeImage,
    RetellLecture,
    AnswerShortQuestion,
    // Writing
    SummarizeWrittenText,
    WriteEssay,
    // Reading
    ReadingWritingFillInBlanks,
    MultipleChoiceMultiple,
    ReorderParagraphs,
    ReadingFillInBlanks,
    MultipleChoiceSingle,
    // Listening
    SummarizeSpokenText,
    ListeningMultipleChoiceMultiple,
    ListeningFillInBlanks,
    HighlightCorrectSummary,
    ListeningMultipleChoiceSingle,
    SelectMissingWord,
    HighlightIncorrectWords,
    WriteFromDictation,
}

/// How a spoken kind is timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakingClass {
    /// Short prepare/record windows; the prompt audio plays right before.
    Repeat,
    /// Long prepare/record windows.
    Extended,
}

/// How a kind is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringFamily {
    ClosedForm,
    ConstrainedText,
    Spoken,
}

impl ItemKind {
    /// Every kind, grouped by section in test order.
    pub const ALL: [ItemKind; 20] = [
        ItemKind::ReadAloud,
        ItemKind::RepeatSentence,
        ItemKind::DescribeImage,
        ItemKind::RetellLecture,
        ItemKind::AnswerShortQuestion,
        ItemKind::SummarizeWrittenText,
        ItemKind::WriteEssay,
        ItemKind::ReadingWritingFillInBlanks,
        ItemKind::MultipleChoiceMultiple,
        ItemKind::ReorderParagraphs,
        ItemKind::ReadingFillInBlanks,
        ItemKind::MultipleChoiceSingle,
        ItemKind::SummarizeSpokenText,
        ItemKind::ListeningMultipleChoiceMultiple,
        ItemKind::ListeningFillInBlanks,
        ItemKind::HighlightCorrectSummary,
        ItemKind::ListeningMultipleChoiceSingle,
        ItemKind::SelectMissingWord,
        ItemKind::HighlightIncorrectWords,
        ItemKind::WriteFromDictation,
    ];

    pub fn section(&self) -> Section {
        use ItemKind::*;
        match self {
            ReadAloud | RepeatSentence | DescribeImage | RetellLecture | AnswerShortQuestion => {
                Section::Speaking
            }
            SummarizeWrittenText | WriteEssay => Section::Writing,
            ReadingWritingFillInBlanks
            | MultipleChoiceMultiple
            | ReorderParagraphs
            | ReadingFillInBlanks
            | MultipleChoiceSingle => Section::Reading,
            SummarizeSpokenText
            | ListeningMultipleChoiceMultiple
            | ListeningFillInBlanks
            | HighlightCorrectSummary
            | ListeningMultipleChoiceSingle
            | SelectMissingWord
            | HighlightIncorrectWords
            | WriteFromDictation => Section::Listening,
        }
    }

    /// `Some` for kinds answered by speaking into the microphone.
    pub fn speaking_class(&self) -> Option<SpeakingClass> {
        match self {
            ItemKind::RepeatSentence | ItemKind::AnswerShortQuestion => {
                Some(SpeakingClass::Repeat)
            }
            ItemKind::ReadAloud | ItemKind::DescribeImage | ItemKind::RetellLecture => {
                Some(SpeakingClass::Extended)
            }
            _ => None,
        }
    }

    pub fn is_spoken(&self) -> bool {
        self.speaking_class().is_some()
    }

    /// Whether the item's prompt is played through speech synthesis.
    pub fn plays_audio(&self) -> bool {
        matches!(
            self,
            ItemKind::RepeatSentence | ItemKind::RetellLecture | ItemKind::AnswerShortQuestion
        ) || self.section() == Section::Listening
    }

    /// The only response shape this kind accepts.
    pub fn response_shape(&self) -> ResponseShape {
        use ItemKind::*;
        if self.is_spoken() {
            return ResponseShape::Audio;
        }
        match self {
            MultipleChoiceMultiple
            | ListeningMultipleChoiceMultiple
            | ReorderParagraphs
            | HighlightIncorrectWords => ResponseShape::Choices,
            ReadingWritingFillInBlanks | ReadingFillInBlanks | ListeningFillInBlanks => {
                ResponseShape::Blanks
            }
            _ => ResponseShape::Text,
        }
    }

    pub fn scoring_family(&self) -> ScoringFamily {
        match self {
            _ if self.is_spoken() => ScoringFamily::Spoken,
            ItemKind::SummarizeWrittenText | ItemKind::WriteEssay | ItemKind::SummarizeSpokenText => {
                ScoringFamily::ConstrainedText
            }
            _ => ScoringFamily::ClosedForm,
        }
    }

    /// Whether array answers must match position by position.
    pub fn order_sensitive(&self) -> bool {
        matches!(self, ItemKind::ReorderParagraphs)
    }

    /// Maximum score used when a pool entry does not set one.
    pub fn default_max_score(&self) -> u32 {
        use ItemKind::*;
        match self {
            ReadAloud => 15,
            RepeatSentence => 13,
            DescribeImage | RetellLecture => 16,
            AnswerShortQuestion => 1,
            SummarizeWrittenText => 7,
            WriteEssay => 15,
            SummarizeSpokenText => 10,
            MultipleChoiceMultiple | ListeningMultipleChoiceMultiple => 2,
            ReorderParagraphs | WriteFromDictation => 3,
            ReadingWritingFillInBlanks | ReadingFillInBlanks | ListeningFillInBlanks => 4,
            HighlightIncorrectWords => 2,
            MultipleChoiceSingle
            | ListeningMultipleChoiceSingle
            | HighlightCorrectSummary
            | SelectMissingWord => 1,
        }
    }

    /// Hard constraints for free-text kinds when a pool entry does not set them.
    pub fn default_constraints(&self) -> Option<TextConstraints> {
        match self {
            ItemKind::SummarizeWrittenText => Some(TextConstraints {
                min_words: 50,
                max_words: 75,
                sentences: Some(1),
            }),
            ItemKind::SummarizeSpokenText => Some(TextConstraints {
                min_words: 50,
                max_words: 70,
                sentences: None,
            }),
            ItemKind::WriteEssay => Some(TextConstraints {
                min_words: 200,
                max_words: 300,
                sentences: None,
            }),
            _ => None,
        }
    }

    fn slug(&self) -> &'static str {
        use ItemKind::*;
        match self {
            ReadAloud => "read-aloud",
            RepeatSentence => "repeat-sentence",
            DescribeImage => "describe-image",
            RetellLecture => "retell-lecture",
            AnswerShortQuestion => "answer-short-question",
            SummarizeWrittenText => "summarize-written-text",
            WriteEssay => "write-essay",
            ReadingWritingFillInBlanks => "reading-writing-fill-in-blanks",
            MultipleChoiceMultiple => "multiple-choice-multiple",
            ReorderParagraphs => "reorder-paragraphs",
            ReadingFillInBlanks => "reading-fill-in-blanks",
            MultipleChoiceSingle => "multiple-choice-single",
            SummarizeSpokenText => "summarize-spoken-text",
            ListeningMultipleChoiceMultiple => "listening-multiple-choice-multiple",
            ListeningFillInBlanks => "listening-fill-in-blanks",
            HighlightCorrectSummary => "highlight-correct-summary",
            ListeningMultipleChoiceSingle => "listening-multiple-choice-single",
            SelectMissingWord => "select-missing-word",
            HighlightIncorrectWords => "highlight-incorrect-words",
            WriteFromDictation => "write-from-dictation",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        ItemKind::ALL
            .iter()
            .copied()
            .find(|k| k.slug() == wanted)
            .ok_or_else(|| format!("unknown item kind: {s}"))
    }
}

/// Word and sentence bounds for free-text responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextConstraints {
    pub min_words: usize,
    pub max_words: usize,
    /// Exact sentence count, if the task requires one.
    #[serde(default)]
    pub sentences: Option<usize>,
}

/// A single exam task. Immutable once generated for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier within the pool.
    pub id: String,
    pub section: Section,
    pub kind: ItemKind,
    /// Instruction or question shown to the candidate.
    pub prompt: String,
    /// Passage text, if any.
    #[serde(default)]
    pub body: Option<String>,
    /// Image reference for describe-image items.
    #[serde(default)]
    pub image: Option<String>,
    /// Text played through speech synthesis when the item starts.
    #[serde(default)]
    pub audio_script: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    /// Canonical answer(s). One entry per blank for fill-in-blank kinds.
    #[serde(default)]
    pub answer: Vec<String>,
    #[serde(default)]
    pub blank_count: usize,
    pub max_score: u32,
    /// Item-specific countdown for non-spoken items.
    #[serde(default)]
    pub time_limit_secs: Option<u32>,
    #[serde(default)]
    pub constraints: Option<TextConstraints>,
}

impl Item {
    /// Build an item with kind defaults and no content beyond the prompt.
    pub fn new(id: impl Into<String>, kind: ItemKind, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            section: kind.section(),
            kind,
            prompt: prompt.into(),
            body: None,
            image: None,
            audio_script: None,
            options: Vec::new(),
            answer: Vec::new(),
            blank_count: 0,
            max_score: kind.default_max_score(),
            time_limit_secs: None,
            constraints: None,
        }
    }

    pub fn with_options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_answer<S: Into<String>>(mut self, answer: impl IntoIterator<Item = S>) -> Self {
        self.answer = answer.into_iter().map(Into::into).collect();
        if self.kind.response_shape() == ResponseShape::Blanks {
            self.blank_count = self.answer.len();
        }
        self
    }

    pub fn with_max_score(mut self, max_score: u32) -> Self {
        self.max_score = max_score;
        self
    }

    pub fn with_audio_script(mut self, script: impl Into<String>) -> Self {
        self.audio_script = Some(script.into());
        self
    }

    pub fn with_time_limit(mut self, secs: u32) -> Self {
        self.time_limit_secs = Some(secs);
        self
    }

    /// Constraints from the item itself, falling back to the kind defaults.
    pub fn effective_constraints(&self) -> Option<TextConstraints> {
        self.constraints.or_else(|| self.kind.default_constraints())
    }
}

/// The structural form of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseShape {
    Text,
    Choices,
    Blanks,
    Audio,
}

impl fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseShape::Text => write!(f, "text"),
            ResponseShape::Choices => write!(f, "choices"),
            ResponseShape::Blanks => write!(f, "blanks"),
            ResponseShape::Audio => write!(f, "audio"),
        }
    }
}

/// A reference to recorded audio owned by the capture service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioHandle {
    pub id: Uuid,
    pub byte_size: u64,
    /// Elapsed capture time reported by the device, in milliseconds.
    pub duration_ms: u64,
}

/// What a spoken item stores once its recording window closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioResponse {
    pub captured: bool,
    /// Seconds spent in the record phase, measured by the timing engine.
    pub duration_secs: u32,
    #[serde(default)]
    pub handle: Option<AudioHandle>,
    /// Set when capture was unavailable and a stand-in was recorded.
    #[serde(default)]
    pub placeholder: bool,
}

impl AudioResponse {
    /// Written when the record window closes, before the capture completes.
    pub fn pending(duration_secs: u32) -> Self {
        Self {
            captured: false,
            duration_secs,
            handle: None,
            placeholder: false,
        }
    }

    /// Deterministic stand-in used when the microphone is unavailable.
    pub fn placeholder(duration_secs: u32) -> Self {
        Self {
            captured: false,
            duration_secs,
            handle: None,
            placeholder: true,
        }
    }

    pub fn with_handle(mut self, handle: AudioHandle) -> Self {
        self.captured = true;
        self.placeholder = false;
        self.handle = Some(handle);
        self
    }
}

/// A candidate's answer to one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Response {
    /// Free text, or the single option selected.
    Text(String),
    /// Several selected options, or an ordering.
    Choices(Vec<String>),
    /// Blank index to the word entered for it.
    Blanks(BTreeMap<usize, String>),
    Audio(AudioResponse),
}

impl Response {
    pub fn shape(&self) -> ResponseShape {
        match self {
            Response::Text(_) => ResponseShape::Text,
            Response::Choices(_) => ResponseShape::Choices,
            Response::Blanks(_) => ResponseShape::Blanks,
            Response::Audio(_) => ResponseShape::Audio,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Response::Text(value.into())
    }

    pub fn choices<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Response::Choices(values.into_iter().map(Into::into).collect())
    }
}

/// Integer sub-skill scores derived for spoken items, each 0..=5.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubSkills {
    pub fluency: u32,
    pub pronunciation: u32,
    pub content: u32,
}

impl SubSkills {
    pub fn combined(&self) -> u32 {
        self.fluency + self.pronunciation + self.content
    }
}

/// Why an item scored zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum ZeroReason {
    NoResponse,
    Incorrect,
    NoAudioCaptured,
    NoDuration,
    AudioTooSmall { byte_size: u64, minimum: u64 },
    SentenceCount { found: usize, expected: usize },
    WordCount { found: usize, min: usize, max: usize },
    GrammarCheck,
    ShapeMismatch,
}

impl ZeroReason {
    /// Constraint violations force a zero regardless of content.
    pub fn is_auto_zero(&self) -> bool {
        !matches!(
            self,
            ZeroReason::NoResponse | ZeroReason::Incorrect | ZeroReason::ShapeMismatch
        )
    }
}

impl fmt::Display for ZeroReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroReason::NoResponse => write!(f, "no response"),
            ZeroReason::Incorrect => write!(f, "incorrect"),
            ZeroReason::NoAudioCaptured => write!(f, "no audio captured"),
            ZeroReason::NoDuration => write!(f, "no recording duration"),
            ZeroReason::AudioTooSmall { byte_size, minimum } => {
                write!(f, "audio too small ({byte_size} < {minimum} bytes)")
            }
            ZeroReason::SentenceCount { found, expected } => {
                write!(f, "{found} sentences, expected {expected}")
            }
            ZeroReason::WordCount { found, min, max } => {
                write!(f, "{found} words, expected {min}-{max}")
            }
            ZeroReason::GrammarCheck => write!(f, "failed grammar check"),
            ZeroReason::ShapeMismatch => write!(f, "response shape mismatch"),
        }
    }
}

/// The score one item earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub item_id: String,
    pub section: Section,
    pub kind: ItemKind,
    pub score: u32,
    pub max: u32,
    #[serde(default)]
    pub sub_skills: Option<SubSkills>,
    pub auto_zero: bool,
    #[serde(default)]
    pub zero_reason: Option<ZeroReason>,
}

impl ScoreResult {
    pub fn new(item: &Item, score: u32) -> Self {
        Self {
            item_id: item.id.clone(),
            section: item.section,
            kind: item.kind,
            score: score.min(item.max_score),
            max: item.max_score,
            sub_skills: None,
            auto_zero: false,
            zero_reason: None,
        }
    }

    pub fn zero(item: &Item, reason: ZeroReason) -> Self {
        Self {
            auto_zero: reason.is_auto_zero(),
            zero_reason: Some(reason),
            ..Self::new(item, 0)
        }
    }

    pub fn with_sub_skills(mut self, sub_skills: SubSkills) -> Self {
        self.sub_skills = Some(sub_skills);
        self
    }
}

/// Details collected in the candidate-info phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInfo {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub candidate_id: Option<String>,
}

/// The confirmations required in the tech-check phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentCheck {
    Microphone,
    Playback,
    Keyboard,
}

impl EquipmentCheck {
    pub const ALL: [EquipmentCheck; 3] = [
        EquipmentCheck::Microphone,
        EquipmentCheck::Playback,
        EquipmentCheck::Keyboard,
    ];
}

impl fmt::Display for EquipmentCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquipmentCheck::Microphone => write!(f, "microphone"),
            EquipmentCheck::Playback => write!(f, "playback"),
            EquipmentCheck::Keyboard => write!(f, "keyboard"),
        }
    }
}
