//! Exam engine: runs a [`SessionController`] against real collaborators.
//!
//! The controller only describes side effects. The engine carries them out
//! on the capture and speech devices, turns device outcomes back into
//! events, and keeps applying them until the controller is quiet.

use std::collections::VecDeque;

use crate::error::{DeviceError, SessionError};
use crate::model::ItemKind;
use crate::report::SessionReport;
use crate::session::{Advisory, Effect, Event, Phase, SessionController};
use crate::traits::{AudioCapture, CaptureTarget, SpeechSynthesizer};

/// Progress notifications.
pub trait SessionObserver: Send + Sync {
    fn on_phase(&self, from: Phase, to: Phase);
    fn on_item(&self, index: usize, total: usize, item_id: &str, kind: ItemKind);
    fn on_advisory(&self, advisory: &Advisory);
    fn on_rejected(&self, event: &str, error: &SessionError);
    fn on_finished(&self, report: &SessionReport);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_phase(&self, _: Phase, _: Phase) {}
    fn on_item(&self, _: usize, _: usize, _: &str, _: ItemKind) {}
    fn on_advisory(&self, _: &Advisory) {}
    fn on_rejected(&self, _: &str, _: &SessionError) {}
    fn on_finished(&self, _: &SessionReport) {}
}

pub struct ExamEngine {
    controller: SessionController,
    capture: Box<dyn AudioCapture>,
    speech: Box<dyn SpeechSynthesizer>,
    observer: Box<dyn SessionObserver>,
    /// Set after a failure retrying cannot fix; later captures are skipped.
    capture_denied: bool,
}

impl ExamEngine {
    pub fn new(
        controller: SessionController,
        capture: Box<dyn AudioCapture>,
        speech: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            controller,
            capture,
            speech,
            observer: Box::new(NoopObserver),
            capture_denied: false,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn capture(&self) -> &dyn AudioCapture {
        self.capture.as_ref()
    }

    /// Apply `event` and everything it sets off.
    ///
    /// Returns every effect carried out, in order. Only a rejection of
    /// `event` itself is an error; device follow-ups never fail the call.
    pub fn dispatch(&mut self, event: Event) -> Result<Vec<Effect>, SessionError> {
        let mut queue = VecDeque::from([event]);
        let mut applied = Vec::new();
        let mut initial = true;

        while let Some(event) = queue.pop_front() {
            let name = event.name();
            let effects = match self.controller.handle(event) {
                Ok(effects) => effects,
                Err(err) => {
                    self.observer.on_rejected(name, &err);
                    if initial {
                        return Err(err);
                    }
                    continue;
                }
            };
            initial = false;

            for effect in &effects {
                if let Some(follow_up) = self.execute(effect) {
                    queue.push_back(follow_up);
                }
            }
            applied.extend(effects);
        }

        Ok(applied)
    }

    fn execute(&mut self, effect: &Effect) -> Option<Event> {
        match effect {
            Effect::PhaseChanged { from, to } => self.observer.on_phase(*from, *to),
            Effect::ItemStarted {
                index,
                total,
                item_id,
                kind,
            } => self.observer.on_item(*index, *total, item_id, *kind),
            Effect::Speak(text) => self.speech.speak(text),
            Effect::CancelSpeech => self.speech.cancel(),
            Effect::PlayCue => self.speech.cue(),
            Effect::StartCapture(target) => return self.start_capture(target),
            Effect::StopCapture(target) => return Some(self.stop_capture(target)),
            Effect::Advisory(advisory) => self.observer.on_advisory(advisory),
            Effect::SessionFinished { .. } => {
                if let Some(report) = self.controller.report() {
                    self.observer.on_finished(report);
                }
            }
        }
        None
    }

    fn start_capture(&mut self, target: &CaptureTarget) -> Option<Event> {
        if self.capture_denied {
            return Some(Event::CaptureUnavailable {
                target: target.clone(),
            });
        }
        if self.capture.is_active() {
            tracing::warn!("releasing a capture left open before {target}");
            if let Err(err) = self.capture.stop() {
                tracing::warn!("could not release capture: {err}");
            }
        }
        match self.capture.start(target) {
            Ok(()) => None,
            Err(err) => {
                self.note_failure(target, &err);
                Some(Event::CaptureUnavailable {
                    target: target.clone(),
                })
            }
        }
    }

    fn stop_capture(&mut self, target: &CaptureTarget) -> Event {
        match self.capture.stop() {
            Ok(handle) => Event::CaptureCompleted {
                target: target.clone(),
                handle,
            },
            Err(err) => {
                self.note_failure(target, &err);
                Event::CaptureUnavailable {
                    target: target.clone(),
                }
            }
        }
    }

    fn note_failure(&mut self, target: &CaptureTarget, err: &DeviceError) {
        tracing::warn!("{} capture for {target} failed: {err}", self.capture.name());
        if err.is_permanent() {
            self.capture_denied = true;
        }
    }
}
