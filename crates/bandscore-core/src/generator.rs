//! Test generator: draws a randomized, ordered item list from a pool.
//!
//! Items are grouped by section in test order and by kind in blueprint
//! order; which pool entries appear is random. The random source is
//! injectable so tests can pin a seed.

use std::collections::{BTreeMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::model::{Item, ItemKind};
use crate::traits::ItemPool;

/// How many items of each kind a test contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, usize>", into = "BTreeMap<String, usize>")]
pub struct Blueprint {
    counts: BTreeMap<ItemKind, usize>,
}

impl Blueprint {
    pub fn from_counts(counts: impl IntoIterator<Item = (ItemKind, usize)>) -> Self {
        Self {
            counts: counts.into_iter().filter(|(_, n)| *n > 0).collect(),
        }
    }

    /// Kinds and counts in test order.
    pub fn entries(&self) -> impl Iterator<Item = (ItemKind, usize)> + '_ {
        self.counts.iter().map(|(k, n)| (*k, *n))
    }

    pub fn count(&self, kind: ItemKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl Default for Blueprint {
    fn default() -> Self {
        use ItemKind::*;
        Self::from_counts([
            (ReadAloud, 2),
            (RepeatSentence, 2),
            (DescribeImage, 1),
            (RetellLecture, 1),
            (AnswerShortQuestion, 2),
            (SummarizeWrittenText, 1),
            (WriteEssay, 1),
            (ReadingWritingFillInBlanks, 1),
            (MultipleChoiceMultiple, 1),
            (ReorderParagraphs, 1),
            (ReadingFillInBlanks, 1),
            (MultipleChoiceSingle, 1),
            (SummarizeSpokenText, 1),
            (ListeningMultipleChoiceMultiple, 1),
            (ListeningFillInBlanks, 1),
            (HighlightCorrectSummary, 1),
            (ListeningMultipleChoiceSingle, 1),
            (SelectMissingWord, 1),
            (HighlightIncorrectWords, 1),
            (WriteFromDictation, 2),
        ])
    }
}

impl TryFrom<BTreeMap<String, usize>> for Blueprint {
    type Error = String;

    fn try_from(raw: BTreeMap<String, usize>) -> Result<Self, Self::Error> {
        let counts = raw
            .into_iter()
            .map(|(kind, n)| Ok((kind.parse::<ItemKind>()?, n)))
            .collect::<Result<Vec<_>, String>>()?;
        Ok(Self::from_counts(counts))
    }
}

impl From<Blueprint> for BTreeMap<String, usize> {
    fn from(blueprint: Blueprint) -> Self {
        blueprint
            .counts
            .into_iter()
            .map(|(k, n)| (k.to_string(), n))
            .collect()
    }
}

/// Builds the item list for a new session.
pub struct TestGenerator {
    blueprint: Blueprint,
    rng: StdRng,
}

impl TestGenerator {
    /// A generator seeded from system entropy.
    pub fn new(blueprint: Blueprint) -> Self {
        Self::with_rng(blueprint, StdRng::from_entropy())
    }

    /// A generator whose draws are reproducible for a given seed.
    pub fn seeded(blueprint: Blueprint, seed: u64) -> Self {
        Self::with_rng(blueprint, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(blueprint: Blueprint, rng: StdRng) -> Self {
        Self { blueprint, rng }
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    /// Draw a fresh item list. Each pool entry appears at most once.
    pub fn generate(&mut self, pool: &dyn ItemPool) -> Vec<Item> {
        let mut items = Vec::with_capacity(self.blueprint.total());
        let mut used = HashSet::new();

        for (kind, wanted) in self.blueprint.entries() {
            let mut candidates = pool.candidates(kind);
            candidates.shuffle(&mut self.rng);

            let before = items.len();
            for item in candidates {
                if items.len() - before == wanted {
                    break;
                }
                if used.insert(item.id.clone()) {
                    items.push(item);
                }
            }

            let drawn = items.len() - before;
            if drawn < wanted {
                tracing::warn!("pool supplied {drawn} of {wanted} {kind} item(s)");
            }
        }

        tracing::debug!("generated {} items", items.len());
        items
    }
}
