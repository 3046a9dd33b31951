//! Deterministic devices driven by a virtual clock.
//!
//! Simulations have no microphone. [`SyntheticMicrophone`] produces a
//! recording whose size is proportional to how long the virtual clock ran
//! while it was open, which is enough for the spoken scoring rules.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use bandscore_core::error::DeviceError;
use bandscore_core::model::AudioHandle;
use bandscore_core::traits::{AudioCapture, CaptureTarget};

/// Shared millisecond counter advanced by whoever delivers ticks.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    millis: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }

    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

/// Microphone that "records" `bytes_per_second` of audio per virtual second.
pub struct SyntheticMicrophone {
    clock: VirtualClock,
    bytes_per_second: u64,
    live: Option<(CaptureTarget, u64)>,
}

impl SyntheticMicrophone {
    pub fn new(clock: VirtualClock, bytes_per_second: u64) -> Self {
        Self {
            clock,
            bytes_per_second,
            live: None,
        }
    }
}

impl AudioCapture for SyntheticMicrophone {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn start(&mut self, target: &CaptureTarget) -> Result<(), DeviceError> {
        if self.live.is_some() {
            return Err(DeviceError::AlreadyRecording);
        }
        tracing::debug!("synthetic capture started for {target}");
        self.live = Some((target.clone(), self.clock.now_millis()));
        Ok(())
    }

    fn stop(&mut self) -> Result<AudioHandle, DeviceError> {
        let (target, started) = self.live.take().ok_or(DeviceError::NotRecording)?;
        let duration_ms = self.clock.now_millis().saturating_sub(started);
        let byte_size = self.bytes_per_second * duration_ms / 1000;
        tracing::debug!("synthetic capture for {target}: {duration_ms}ms, {byte_size} bytes");
        Ok(AudioHandle {
            id: Uuid::new_v4(),
            byte_size,
            duration_ms,
        })
    }

    fn is_active(&self) -> bool {
        self.live.is_some()
    }
}

/// Microphone whose every start fails, as when permission was refused.
pub struct UnavailableMicrophone {
    error: DeviceError,
}

impl UnavailableMicrophone {
    pub fn denied() -> Self {
        Self {
            error: DeviceError::PermissionDenied,
        }
    }

    pub fn missing(reason: impl Into<String>) -> Self {
        Self {
            error: DeviceError::Unavailable(reason.into()),
        }
    }
}

impl AudioCapture for UnavailableMicrophone {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn start(&mut self, _target: &CaptureTarget) -> Result<(), DeviceError> {
        Err(self.error.clone())
    }

    fn stop(&mut self) -> Result<AudioHandle, DeviceError> {
        Err(DeviceError::NotRecording)
    }

    fn is_active(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_shared_between_clones() {
        let clock = VirtualClock::new();
        let other = clock.clone();
        clock.advance(1500);
        assert_eq!(other.now_millis(), 1500);
    }

    #[test]
    fn recording_size_follows_virtual_time() {
        let clock = VirtualClock::new();
        let mut mic = SyntheticMicrophone::new(clock.clone(), 8000);

        clock.advance(5000);
        mic.start(&CaptureTarget::Item("rs-1".into())).unwrap();
        assert!(mic.is_active());
        clock.advance(2500);

        let handle = mic.stop().unwrap();
        assert_eq!(handle.duration_ms, 2500);
        assert_eq!(handle.byte_size, 20_000);
        assert!(!mic.is_active());
    }

    #[test]
    fn one_capture_at_a_time() {
        let mut mic = SyntheticMicrophone::new(VirtualClock::new(), 8000);
        mic.start(&CaptureTarget::IntroRecording).unwrap();
        assert_eq!(
            mic.start(&CaptureTarget::IntroRecording),
            Err(DeviceError::AlreadyRecording)
        );
        mic.stop().unwrap();
        assert_eq!(mic.stop(), Err(DeviceError::NotRecording));
    }

    #[test]
    fn unavailable_microphone_never_starts() {
        let mut mic = UnavailableMicrophone::denied();
        let err = mic.start(&CaptureTarget::IntroRecording).unwrap_err();
        assert!(err.is_permanent());
        assert!(!mic.is_active());

        let mut mic = UnavailableMicrophone::missing("no input device");
        assert_eq!(
            mic.start(&CaptureTarget::IntroRecording),
            Err(DeviceError::Unavailable("no input device".into()))
        );
    }
}
