//! bandscore-devices — Audio capture, speech playback, and configuration.
//!
//! Implements the `AudioCapture` and `SpeechSynthesizer` traits for
//! simulated and test use, and loads `bandscore.toml`.

pub mod config;
pub mod consent;
pub mod mock;
pub mod speech;
pub mod synthetic;

pub use config::{
    create_capture, create_speech, load_config, load_config_from, BandscoreConfig, CaptureKind,
    ConsentConfig, DeviceConfig, SpeechKind,
};
pub use consent::set_consent;
pub use synthetic::{SyntheticMicrophone, UnavailableMicrophone, VirtualClock};
