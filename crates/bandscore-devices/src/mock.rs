//! Mock devices for testing the engine without audio hardware.
//!
//! Both mocks keep their call log behind an `Arc`, so a test can hold on to
//! it after the device itself has been boxed and moved into an engine.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use bandscore_core::error::DeviceError;
use bandscore_core::model::AudioHandle;
use bandscore_core::traits::{AudioCapture, CaptureTarget, SpeechSynthesizer};

/// Calls observed by a [`MockCapture`].
#[derive(Debug, Default)]
pub struct CaptureLog {
    starts: AtomicU32,
    stops: AtomicU32,
    targets: Mutex<Vec<CaptureTarget>>,
}

impl CaptureLog {
    pub fn start_count(&self) -> u32 {
        self.starts.load(Ordering::Relaxed)
    }

    pub fn stop_count(&self) -> u32 {
        self.stops.load(Ordering::Relaxed)
    }

    /// Every target a capture was requested for, in order.
    pub fn targets(&self) -> Vec<CaptureTarget> {
        self.targets.lock().unwrap().clone()
    }

    pub fn last_target(&self) -> Option<CaptureTarget> {
        self.targets.lock().unwrap().last().cloned()
    }
}

/// A capture device returning a fixed-size recording, or a fixed failure.
pub struct MockCapture {
    byte_size: u64,
    duration_ms: u64,
    failure: Option<DeviceError>,
    live: bool,
    log: Arc<CaptureLog>,
}

impl MockCapture {
    /// Every stop yields `byte_size` bytes over `duration_ms`.
    pub fn with_recording(byte_size: u64, duration_ms: u64) -> Self {
        Self {
            byte_size,
            duration_ms,
            failure: None,
            live: false,
            log: Arc::new(CaptureLog::default()),
        }
    }

    /// Every start fails with `error`.
    pub fn failing(error: DeviceError) -> Self {
        Self {
            failure: Some(error),
            ..Self::with_recording(0, 0)
        }
    }

    pub fn log(&self) -> Arc<CaptureLog> {
        Arc::clone(&self.log)
    }
}

impl AudioCapture for MockCapture {
    fn name(&self) -> &str {
        "mock"
    }

    fn start(&mut self, target: &CaptureTarget) -> Result<(), DeviceError> {
        self.log.starts.fetch_add(1, Ordering::Relaxed);
        self.log.targets.lock().unwrap().push(target.clone());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.live {
            return Err(DeviceError::AlreadyRecording);
        }
        self.live = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<AudioHandle, DeviceError> {
        self.log.stops.fetch_add(1, Ordering::Relaxed);
        if !self.live {
            return Err(DeviceError::NotRecording);
        }
        self.live = false;
        Ok(AudioHandle {
            id: Uuid::new_v4(),
            byte_size: self.byte_size,
            duration_ms: self.duration_ms,
        })
    }

    fn is_active(&self) -> bool {
        self.live
    }
}

/// Calls observed by a [`MockSpeech`].
#[derive(Debug, Default)]
pub struct SpeechLog {
    utterances: Mutex<Vec<String>>,
    cancels: AtomicU32,
    cues: AtomicU32,
}

impl SpeechLog {
    pub fn utterances(&self) -> Vec<String> {
        self.utterances.lock().unwrap().clone()
    }

    pub fn cancel_count(&self) -> u32 {
        self.cancels.load(Ordering::Relaxed)
    }

    pub fn cue_count(&self) -> u32 {
        self.cues.load(Ordering::Relaxed)
    }
}

/// A speech synthesizer that only records what it was asked to do.
#[derive(Default)]
pub struct MockSpeech {
    log: Arc<SpeechLog>,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Arc<SpeechLog> {
        Arc::clone(&self.log)
    }
}

impl SpeechSynthesizer for MockSpeech {
    fn speak(&mut self, text: &str) {
        self.log.utterances.lock().unwrap().push(text.to_string());
    }

    fn cancel(&mut self) {
        self.log.cancels.fetch_add(1, Ordering::Relaxed);
    }

    fn cue(&mut self) {
        self.log.cues.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_log_survives_boxing() {
        let mic = MockCapture::with_recording(32_000, 4_000);
        let log = mic.log();
        let mut boxed: Box<dyn AudioCapture> = Box::new(mic);

        boxed.start(&CaptureTarget::Item("di-1".into())).unwrap();
        let handle = boxed.stop().unwrap();

        assert_eq!(handle.byte_size, 32_000);
        assert_eq!(log.start_count(), 1);
        assert_eq!(log.stop_count(), 1);
        assert_eq!(log.last_target(), Some(CaptureTarget::Item("di-1".into())));
    }

    #[test]
    fn failing_capture_still_logs_attempts() {
        let mut mic = MockCapture::failing(DeviceError::PermissionDenied);
        let log = mic.log();
        assert_eq!(
            mic.start(&CaptureTarget::IntroRecording),
            Err(DeviceError::PermissionDenied)
        );
        assert!(!mic.is_active());
        assert_eq!(log.targets(), vec![CaptureTarget::IntroRecording]);
    }

    #[test]
    fn speech_log_records_calls() {
        let mut speech = MockSpeech::new();
        let log = speech.log();
        speech.speak("Listen carefully.");
        speech.cue();
        speech.cancel();
        assert_eq!(log.utterances(), vec!["Listen carefully.".to_string()]);
        assert_eq!(log.cue_count(), 1);
        assert_eq!(log.cancel_count(), 1);
    }
}
