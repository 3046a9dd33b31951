//! TOML item pool loader.
//!
//! Loads item pools from TOML files and directories, and validates them
//! against the kinds and answer shapes the scorers expect.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::generator::Blueprint;
use crate::model::{Item, ItemKind, ResponseShape, ScoringFamily, TextConstraints};
use crate::traits::ItemPool;

/// An in-memory, read-only item pool.
#[derive(Debug, Clone, Default)]
pub struct StaticPool {
    pub id: String,
    pub name: String,
    pub description: String,
    items: Vec<Item>,
}

impl StaticPool {
    pub fn new(id: impl Into<String>, name: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            items,
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Merge several pools into one, keeping item order.
    pub fn merged(pools: Vec<StaticPool>) -> StaticPool {
        let mut merged = StaticPool {
            id: pools
                .iter()
                .map(|p| p.id.as_str())
                .collect::<Vec<_>>()
                .join("+"),
            name: pools
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            ..Default::default()
        };
        for pool in pools {
            merged.items.extend(pool.items);
        }
        merged
    }

    /// Number of items per kind.
    pub fn counts(&self) -> BTreeMap<ItemKind, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts.entry(item.kind).or_insert(0) += 1;
        }
        counts
    }
}

impl ItemPool for StaticPool {
    fn candidates(&self, kind: ItemKind) -> Vec<Item> {
        self.items
            .iter()
            .filter(|item| item.kind == kind)
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Intermediate TOML structure for parsing pool files.
#[derive(Debug, Deserialize)]
struct TomlPoolFile {
    pool: TomlPoolHeader,
    #[serde(default)]
    items: Vec<TomlItem>,
}

#[derive(Debug, Deserialize)]
struct TomlPoolHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlItem {
    id: String,
    kind: String,
    prompt: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    audio_script: Option<String>,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    answer: Vec<String>,
    #[serde(default)]
    blank_count: Option<usize>,
    #[serde(default)]
    max_score: Option<u32>,
    #[serde(default)]
    time_limit_secs: Option<u32>,
    #[serde(default)]
    constraints: Option<TextConstraints>,
}

/// Parse a single TOML file into a `StaticPool`.
pub fn parse_pool(path: &Path) -> Result<StaticPool> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read pool file: {}", path.display()))?;

    parse_pool_str(&content, path)
}

/// Parse a TOML string into a `StaticPool` (useful for testing).
pub fn parse_pool_str(content: &str, source_path: &Path) -> Result<StaticPool> {
    let parsed: TomlPoolFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let items = parsed
        .items
        .into_iter()
        .map(|raw| {
            let kind: ItemKind = raw
                .kind
                .parse()
                .map_err(|e: String| anyhow::anyhow!("item {}: {}", raw.id, e))?;

            let blank_count = match kind.response_shape() {
                ResponseShape::Blanks => raw.blank_count.unwrap_or(raw.answer.len()),
                _ => raw.blank_count.unwrap_or(0),
            };

            Ok(Item {
                id: raw.id,
                section: kind.section(),
                kind,
                prompt: raw.prompt,
                body: raw.body,
                image: raw.image,
                audio_script: raw.audio_script,
                options: raw.options,
                answer: raw.answer,
                blank_count,
                max_score: raw.max_score.unwrap_or_else(|| kind.default_max_score()),
                time_limit_secs: raw.time_limit_secs,
                constraints: raw.constraints,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(StaticPool {
        id: parsed.pool.id,
        name: parsed.pool.name,
        description: parsed.pool.description,
        items,
    })
}

/// Recursively load all `.toml` pool files from a directory.
pub fn load_pool_directory(dir: &Path) -> Result<Vec<StaticPool>> {
    let mut pools = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    // read_dir order is platform dependent; seeded generation needs a stable pool
    paths.sort();

    for path in paths {
        if path.is_dir() {
            pools.extend(load_pool_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_pool(&path) {
                Ok(pool) => pools.push(pool),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(pools)
}

/// Load a pool file, or merge every pool under a directory.
pub fn load_pool(path: &Path) -> Result<StaticPool> {
    if path.is_dir() {
        let pools = load_pool_directory(path)?;
        anyhow::ensure!(!pools.is_empty(), "no pool files in {}", path.display());
        Ok(StaticPool::merged(pools))
    } else {
        parse_pool(path)
    }
}

/// A warning from pool validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The item ID (if applicable).
    pub item_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn item(item: &Item, message: impl Into<String>) -> Self {
        Self {
            item_id: Some(item.id.clone()),
            message: message.into(),
        }
    }
}

/// Validate a pool for common content issues.
pub fn validate_pool(pool: &StaticPool) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = HashSet::new();
    for item in pool.items() {
        if !seen_ids.insert(&item.id) {
            warnings.push(ValidationWarning::item(
                item,
                format!("duplicate item ID: {}", item.id),
            ));
        }
    }

    for item in pool.items() {
        if item.prompt.trim().is_empty() {
            warnings.push(ValidationWarning::item(item, "prompt is empty"));
        }

        if item.kind.scoring_family() == ScoringFamily::ClosedForm && item.answer.is_empty() {
            warnings.push(ValidationWarning::item(
                item,
                "closed-form item has no canonical answer and can never earn credit",
            ));
        }

        match item.kind.response_shape() {
            ResponseShape::Blanks if item.blank_count != item.answer.len() => {
                warnings.push(ValidationWarning::item(
                    item,
                    format!(
                        "{} blanks but {} answers",
                        item.blank_count,
                        item.answer.len()
                    ),
                ));
            }
            ResponseShape::Text
                if item.kind.scoring_family() == ScoringFamily::ClosedForm
                    && !item.options.is_empty() =>
            {
                if let Some(answer) = item.answer.first() {
                    if !item.options.contains(answer) {
                        warnings.push(ValidationWarning::item(
                            item,
                            format!("answer '{answer}' is not one of the options"),
                        ));
                    }
                }
            }
            _ => {}
        }

        if item.kind.plays_audio() && item.audio_script.is_none() {
            warnings.push(ValidationWarning::item(
                item,
                "item plays audio but has no audio_script",
            ));
        }

        if item.kind == ItemKind::DescribeImage && item.image.is_none() {
            warnings.push(ValidationWarning::item(
                item,
                "describe-image item has no image",
            ));
        }

        if let Some(c) = item.constraints {
            if c.min_words > c.max_words {
                warnings.push(ValidationWarning::item(
                    item,
                    format!("min_words {} exceeds max_words {}", c.min_words, c.max_words),
                ));
            }
        }

        if item.max_score == 0 {
            warnings.push(ValidationWarning::item(item, "max_score is 0"));
        }
    }

    warnings
}

/// Report blueprint kinds the pool cannot fully supply.
pub fn check_coverage(pool: &StaticPool, blueprint: &Blueprint) -> Vec<ValidationWarning> {
    let counts = pool.counts();
    blueprint
        .entries()
        .filter_map(|(kind, wanted)| {
            let available = counts.get(&kind).copied().unwrap_or(0);
            (available < wanted).then(|| ValidationWarning {
                item_id: None,
                message: format!("blueprint wants {wanted} {kind} item(s), pool has {available}"),
            })
        })
        .collect()
}
