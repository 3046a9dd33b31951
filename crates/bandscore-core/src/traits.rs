//! Collaborator traits the engine consumes but does not implement.
//!
//! Device implementations live in the `bandscore-devices` crate; item pools
//! are loaded by [`crate::pool`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;
use crate::model::{AudioHandle, Item, ItemKind};

// ---------------------------------------------------------------------------
// Audio capture
// ---------------------------------------------------------------------------

/// What a capture is recording for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "target", content = "item_id", rename_all = "kebab-case")]
pub enum CaptureTarget {
    /// The unscored introduction recorded before the test.
    IntroRecording,
    /// A spoken item.
    Item(String),
}

impl fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureTarget::IntroRecording => write!(f, "intro-recording"),
            CaptureTarget::Item(id) => write!(f, "item {id}"),
        }
    }
}

/// Microphone recording service.
///
/// At most one capture is live at a time. `stop` is the completion callback:
/// it releases the stream and yields the recorded handle.
pub trait AudioCapture: Send {
    /// Human-readable device name.
    fn name(&self) -> &str;

    /// Begin recording for `target`.
    fn start(&mut self, target: &CaptureTarget) -> Result<(), DeviceError>;

    /// Stop the live capture and hand back what was recorded.
    fn stop(&mut self) -> Result<AudioHandle, DeviceError>;

    /// Whether a capture stream is currently open.
    fn is_active(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Speech synthesis
// ---------------------------------------------------------------------------

/// Text-to-speech playback used for listening passages and repeat prompts.
pub trait SpeechSynthesizer: Send {
    fn speak(&mut self, text: &str);

    /// Stop any queued or playing utterance.
    fn cancel(&mut self);

    /// Short audible cue marking the start of a recording window.
    fn cue(&mut self) {}
}

// ---------------------------------------------------------------------------
// Content collaborators
// ---------------------------------------------------------------------------

/// Read-only source of items the test generator draws from.
pub trait ItemPool: Send + Sync {
    /// Every item of the given kind, in pool order.
    fn candidates(&self, kind: ItemKind) -> Vec<Item>;

    /// Total number of items in the pool.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Persistent flag recording that the candidate accepted the disclaimer.
///
/// The engine only reads it.
pub trait ConsentSource: Send + Sync {
    fn has_consented(&self) -> bool;
}

impl ConsentSource for bool {
    fn has_consented(&self) -> bool {
        *self
    }
}
