//! Session and device error types.
//!
//! Both enums are defined here so the engine can classify failures without
//! string matching: rejected events never abort a session, and device
//! failures degrade to placeholder responses.

use thiserror::Error;

use crate::model::{ResponseShape, Section};
use crate::session::Phase;

/// Reasons the session controller rejects an event.
///
/// A rejected event leaves the session state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The event has no meaning in the current phase.
    #[error("event '{event}' is not valid during the {phase} phase")]
    InvalidEvent { phase: Phase, event: &'static str },

    /// The item id is not part of the active session.
    #[error("unknown item: {0}")]
    UnknownItem(String),

    /// Responses may only be written to the item currently on screen.
    #[error("item {0} is not the current item")]
    NotCurrentItem(String),

    /// The item's active window has closed.
    #[error("response for item {0} is sealed")]
    ResponseSealed(String),

    /// The response shape does not fit the item kind.
    #[error("item {item_id} expects a {expected} response, got {found}")]
    ShapeMismatch {
        item_id: String,
        expected: ResponseShape,
        found: ResponseShape,
    },

    /// A blank index beyond the item's blank count.
    #[error("item {item_id} has {blank_count} blanks, index {index} is out of range")]
    BlankOutOfRange {
        item_id: String,
        index: usize,
        blank_count: usize,
    },

    /// Audio only enters the store through the recorder.
    #[error("item {0} takes its audio from the recorder, not a submission")]
    AudioNotSubmittable(String),

    /// Recording controls were used on an item that is not spoken.
    #[error("item {item_id} in section {section} has no recording window")]
    NotRecordable { item_id: String, section: Section },
}

/// Errors raised by audio capture and playback collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The user or platform denied microphone access.
    #[error("microphone permission denied")]
    PermissionDenied,

    /// The device is missing or failed.
    #[error("device unavailable: {0}")]
    Unavailable(String),

    /// `start` was called while a capture was still live.
    #[error("a capture is already in progress")]
    AlreadyRecording,

    /// `stop` was called with no live capture.
    #[error("no capture in progress")]
    NotRecording,
}

impl DeviceError {
    /// Returns `true` if retrying on a later item cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            DeviceError::PermissionDenied | DeviceError::Unavailable(_)
        )
    }
}
