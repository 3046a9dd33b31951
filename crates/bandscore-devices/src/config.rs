//! Configuration loading and device factory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use bandscore_core::generator::Blueprint;
use bandscore_core::scoring::ScoringConfig;
use bandscore_core::timing::TimingConfig;
use bandscore_core::traits::{AudioCapture, ConsentSource, SpeechSynthesizer};

use crate::speech::{LoggingSpeech, SilentSpeech};
use crate::synthetic::{SyntheticMicrophone, UnavailableMicrophone, VirtualClock};

/// File name searched for in the current directory.
pub const CONFIG_FILE_NAME: &str = "bandscore.toml";

/// Environment variable overriding `seed`.
pub const SEED_ENV: &str = "BANDSCORE_SEED";

/// Top-level bandscore configuration. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandscoreConfig {
    /// Seed for item selection. Entropy when unset.
    pub seed: Option<u64>,
    pub consent: ConsentConfig,
    pub timing: TimingConfig,
    pub scoring: ScoringConfig,
    /// Item counts per kind.
    pub blueprint: Blueprint,
    pub devices: DeviceConfig,
}

/// The persisted disclaimer acceptance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    pub accepted: bool,
}

impl ConsentSource for ConsentConfig {
    fn has_consented(&self) -> bool {
        self.accepted
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    #[default]
    Synthetic,
    Unavailable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechKind {
    #[default]
    Logging,
    Silent,
}

/// Which devices a run uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub capture: CaptureKind,
    /// Recording rate of the synthetic microphone.
    pub bytes_per_second: u64,
    pub speech: SpeechKind,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            capture: CaptureKind::Synthetic,
            bytes_per_second: 8000,
            speech: SpeechKind::Logging,
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `bandscore.toml` in the current directory
/// 2. `~/.config/bandscore/config.toml`
///
/// Environment variable override: `BANDSCORE_SEED`.
pub fn load_config() -> Result<BandscoreConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<BandscoreConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => default_config_path(),
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<BandscoreConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => BandscoreConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

impl BandscoreConfig {
    /// Reject values that deserialize but cannot drive a session.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.timing.tick_millis > 0,
            "timing.tick_millis must be greater than 0"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.scoring.partial_credit),
            "scoring.partial_credit must be between 0 and 1, got {}",
            self.scoring.partial_credit
        );
        Ok(())
    }
}

/// The first existing file in the search order, if any.
pub fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    let global = dirs_path()?.join("config.toml");
    global.exists().then_some(global)
}

fn apply_env_overrides(
    config: &mut BandscoreConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(raw) = lookup(SEED_ENV) {
        let seed = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{SEED_ENV} must be an unsigned integer, got '{raw}'"))?;
        config.seed = Some(seed);
    }
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("bandscore"))
}

/// Create the capture device described by `config`.
///
/// The synthetic microphone measures recordings on `clock`.
pub fn create_capture(config: &DeviceConfig, clock: VirtualClock) -> Box<dyn AudioCapture> {
    match config.capture {
        CaptureKind::Synthetic => {
            Box::new(SyntheticMicrophone::new(clock, config.bytes_per_second))
        }
        CaptureKind::Unavailable => Box::new(UnavailableMicrophone::denied()),
    }
}

/// Create the speech synthesizer described by `config`.
pub fn create_speech(config: &DeviceConfig) -> Box<dyn SpeechSynthesizer> {
    match config.speech {
        SpeechKind::Logging => Box::new(LoggingSpeech::new()),
        SpeechKind::Silent => Box::new(SilentSpeech),
    }
}
