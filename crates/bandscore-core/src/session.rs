//! Session controller: the phase state machine of one attempt.
//!
//! The controller owns a [`SessionContext`] and mutates nothing else.
//! [`SessionController::handle`] applies one [`Event`] and returns the
//! [`Effect`]s the caller must carry out against the devices. Device
//! outcomes come back as `CaptureCompleted` / `CaptureUnavailable` events.
//!
//! Phases run strictly forward:
//! `intro → candidate-info → tech-check → intro-recording → test-intro →
//! active → finished`, and `finished → intro` on retake.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::generator::TestGenerator;
use crate::model::{
    AudioHandle, AudioResponse, CandidateInfo, EquipmentCheck, Item, ItemKind, Response,
};
use crate::report::SessionReport;
use crate::responses::ResponseStore;
use crate::scoring::ScoringPipeline;
use crate::statistics::aggregate;
use crate::timing::{TimerSignal, TimingConfig, TimingEngine};
use crate::traits::{CaptureTarget, ConsentSource, ItemPool};

// ---------------------------------------------------------------------------
// Phases, events and effects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Intro,
    CandidateInfo,
    TechCheck,
    IntroRecording,
    TestIntro,
    Active,
    Finished,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Intro,
        Phase::CandidateInfo,
        Phase::TechCheck,
        Phase::IntroRecording,
        Phase::TestIntro,
        Phase::Active,
        Phase::Finished,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Intro => "intro",
            Phase::CandidateInfo => "candidate-info",
            Phase::TechCheck => "tech-check",
            Phase::IntroRecording => "intro-recording",
            Phase::TestIntro => "test-intro",
            Phase::Active => "active",
            Phase::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// An input to the controller: a candidate action, a clock tick, or a
/// device outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Move to the next phase, or to the next item while active.
    Advance,
    AcknowledgeDisclaimer,
    SubmitCandidateInfo(CandidateInfo),
    ConfirmCheck(EquipmentCheck),
    StartRecording,
    StopRecording,
    /// One second passed.
    Tick,
    SubmitResponse {
        item_id: String,
        response: Response,
    },
    FillBlank {
        item_id: String,
        index: usize,
        value: String,
    },
    /// A stopped capture delivered its recording.
    CaptureCompleted {
        target: CaptureTarget,
        handle: AudioHandle,
    },
    /// A capture could not be started or did not deliver.
    CaptureUnavailable { target: CaptureTarget },
    /// End the test now and score it. Repeating it after the end re-scores.
    Finalize,
    /// Discard the finished attempt and start over.
    Retake,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Advance => "advance",
            Event::AcknowledgeDisclaimer => "acknowledge-disclaimer",
            Event::SubmitCandidateInfo(_) => "submit-candidate-info",
            Event::ConfirmCheck(_) => "confirm-check",
            Event::StartRecording => "start-recording",
            Event::StopRecording => "stop-recording",
            Event::Tick => "tick",
            Event::SubmitResponse { .. } => "submit-response",
            Event::FillBlank { .. } => "fill-blank",
            Event::CaptureCompleted { .. } => "capture-completed",
            Event::CaptureUnavailable { .. } => "capture-unavailable",
            Event::Finalize => "finalize",
            Event::Retake => "retake",
        }
    }
}

/// Non-blocking notice for the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Advisory {
    DisclaimerRequired,
    CandidateInfoMissing,
    ChecksPending { missing: Vec<EquipmentCheck> },
    IntroRecordingPending,
    TimeManagement { item_id: String, elapsed_secs: u32 },
    ItemTimedOut { item_id: String },
    MicrophoneUnavailable { target: CaptureTarget },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::DisclaimerRequired => write!(f, "acknowledge the disclaimer to continue"),
            Advisory::CandidateInfoMissing => write!(f, "enter your name to continue"),
            Advisory::ChecksPending { missing } => {
                let names: Vec<String> = missing.iter().map(|c| c.to_string()).collect();
                write!(f, "confirm equipment: {}", names.join(", "))
            }
            Advisory::IntroRecordingPending => write!(f, "record your introduction first"),
            Advisory::TimeManagement {
                item_id,
                elapsed_secs,
            } => write!(
                f,
                "{elapsed_secs}s spent on {item_id}; consider moving on"
            ),
            Advisory::ItemTimedOut { item_id } => write!(f, "time is up for {item_id}"),
            Advisory::MicrophoneUnavailable { target } => {
                write!(f, "microphone unavailable for {target}")
            }
        }
    }
}

/// A side effect the controller requests. Carried out by
/// [`crate::engine::ExamEngine`] or by a test.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    ItemStarted {
        index: usize,
        total: usize,
        item_id: String,
        kind: ItemKind,
    },
    Speak(String),
    CancelSpeech,
    PlayCue,
    StartCapture(CaptureTarget),
    /// Stop the live capture; its outcome is fed back as an event.
    StopCapture(CaptureTarget),
    Advisory(Advisory),
    SessionFinished {
        session_id: Uuid,
        overall: u32,
    },
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// The generated test of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSession {
    pub id: Uuid,
    pub items: Vec<Item>,
    pub started_at: DateTime<Utc>,
    /// Index of the item on screen; equal to `items.len()` once past the end.
    pub current: usize,
}

impl TestSession {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            id: Uuid::new_v4(),
            items,
            started_at: Utc::now(),
            current: 0,
        }
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.items.get(self.current)
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.items.len()
    }

    fn open_item(&self, item_id: &str) -> Result<&Item, SessionError> {
        let index = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| SessionError::UnknownItem(item_id.to_string()))?;
        if index != self.current {
            return Err(SessionError::NotCurrentItem(item_id.to_string()));
        }
        Ok(&self.items[index])
    }
}

/// Everything scoped to one attempt. Replaced wholesale on retake.
#[derive(Debug)]
pub struct SessionContext {
    phase: Phase,
    disclaimer_acknowledged: bool,
    candidate: Option<CandidateInfo>,
    checks: BTreeSet<EquipmentCheck>,
    intro_recording: Option<AudioResponse>,
    session: Option<TestSession>,
    responses: ResponseStore,
    timer: TimingEngine,
    /// Capture started and not yet stopped.
    live_capture: Option<CaptureTarget>,
    /// Capture whose start failed; its window gets a placeholder.
    failed_capture: Option<CaptureTarget>,
    /// Captures stopped and awaiting their outcome.
    stopping: Vec<CaptureTarget>,
    finish_requested: bool,
    advisories: Vec<Advisory>,
    report: Option<SessionReport>,
}

impl SessionContext {
    fn new(timing: TimingConfig) -> Self {
        Self {
            phase: Phase::Intro,
            disclaimer_acknowledged: false,
            candidate: None,
            checks: BTreeSet::new(),
            intro_recording: None,
            session: None,
            responses: ResponseStore::new(),
            timer: TimingEngine::new(timing),
            live_capture: None,
            failed_capture: None,
            stopping: Vec::new(),
            finish_requested: false,
            advisories: Vec::new(),
            report: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct SessionController {
    pool: Arc<dyn ItemPool>,
    generator: TestGenerator,
    pipeline: ScoringPipeline,
    consent: Arc<dyn ConsentSource>,
    ctx: SessionContext,
}

impl SessionController {
    pub fn new(pool: Arc<dyn ItemPool>, generator: TestGenerator) -> Self {
        Self {
            pool,
            generator,
            pipeline: ScoringPipeline::default(),
            consent: Arc::new(false),
            ctx: SessionContext::new(TimingConfig::default()),
        }
    }

    pub fn with_pipeline(mut self, pipeline: ScoringPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.ctx.timer = TimingEngine::new(timing);
        self
    }

    pub fn with_consent(mut self, consent: Arc<dyn ConsentSource>) -> Self {
        self.consent = consent;
        self
    }

    pub fn phase(&self) -> Phase {
        self.ctx.phase
    }

    pub fn session(&self) -> Option<&TestSession> {
        self.ctx.session.as_ref()
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.ctx.session.as_ref()?.current_item()
    }

    pub fn responses(&self) -> &ResponseStore {
        &self.ctx.responses
    }

    pub fn timer(&self) -> &TimingEngine {
        &self.ctx.timer
    }

    pub fn candidate(&self) -> Option<&CandidateInfo> {
        self.ctx.candidate.as_ref()
    }

    pub fn intro_recording(&self) -> Option<&AudioResponse> {
        self.ctx.intro_recording.as_ref()
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.ctx.advisories
    }

    /// The scored report, once finished.
    pub fn report(&self) -> Option<&SessionReport> {
        self.ctx.report.as_ref()
    }

    /// Whether a capture is live or awaiting its outcome.
    pub fn capture_pending(&self) -> bool {
        self.ctx.live_capture.is_some() || !self.ctx.stopping.is_empty()
    }

    /// Apply one event. On error the session is left as it was.
    pub fn handle(&mut self, event: Event) -> Result<Vec<Effect>, SessionError> {
        let phase = self.ctx.phase;
        let name = event.name();
        let mut fx = Vec::new();

        let outcome = match event {
            Event::Tick => {
                self.on_tick(&mut fx);
                Ok(())
            }
            Event::CaptureCompleted { target, handle } => {
                self.on_capture_completed(target, handle, &mut fx);
                Ok(())
            }
            Event::CaptureUnavailable { target } => {
                self.on_capture_unavailable(target, &mut fx);
                Ok(())
            }
            Event::Advance => self.on_advance(&mut fx),
            Event::AcknowledgeDisclaimer if phase == Phase::Intro => {
                self.ctx.disclaimer_acknowledged = true;
                Ok(())
            }
            Event::SubmitCandidateInfo(info) if phase == Phase::CandidateInfo => {
                if info.name.trim().is_empty() {
                    self.advise(Advisory::CandidateInfoMissing, &mut fx);
                } else {
                    self.ctx.candidate = Some(info);
                }
                Ok(())
            }
            Event::ConfirmCheck(check) if phase == Phase::TechCheck => {
                self.ctx.checks.insert(check);
                Ok(())
            }
            Event::StartRecording if phase == Phase::IntroRecording => {
                self.start_intro_recording(&mut fx);
                Ok(())
            }
            Event::StopRecording if phase == Phase::IntroRecording => {
                match self.ctx.timer.stop_recording() {
                    Some(elapsed) => {
                        self.finish_intro_recording(elapsed, &mut fx);
                        Ok(())
                    }
                    None => Err(SessionError::InvalidEvent { phase, event: name }),
                }
            }
            Event::StartRecording if phase == Phase::Active => self.start_item_recording(&mut fx),
            Event::StopRecording if phase == Phase::Active => self.stop_item_recording(&mut fx),
            Event::SubmitResponse { item_id, response } if phase == Phase::Active => {
                self.submit(&item_id, response)
            }
            Event::FillBlank {
                item_id,
                index,
                value,
            } if phase == Phase::Active => self.fill_blank(&item_id, index, value),
            Event::Finalize if matches!(phase, Phase::Active | Phase::Finished) => {
                self.finalize(&mut fx);
                Ok(())
            }
            Event::Retake if phase == Phase::Finished => {
                self.retake(&mut fx);
                Ok(())
            }
            _ => Err(SessionError::InvalidEvent { phase, event: name }),
        };

        match outcome {
            Ok(()) => Ok(fx),
            Err(err) => {
                tracing::warn!("rejected {name}: {err}");
                Err(err)
            }
        }
    }

    // -- gating ------------------------------------------------------------

    fn on_advance(&mut self, fx: &mut Vec<Effect>) -> Result<(), SessionError> {
        match self.ctx.phase {
            Phase::Intro => {
                if self.ctx.disclaimer_acknowledged || self.consent.has_consented() {
                    self.set_phase(Phase::CandidateInfo, fx);
                } else {
                    self.advise(Advisory::DisclaimerRequired, fx);
                }
            }
            Phase::CandidateInfo => {
                if self.ctx.candidate.is_some() {
                    self.set_phase(Phase::TechCheck, fx);
                } else {
                    self.advise(Advisory::CandidateInfoMissing, fx);
                }
            }
            Phase::TechCheck => {
                let missing: Vec<EquipmentCheck> = EquipmentCheck::ALL
                    .into_iter()
                    .filter(|c| !self.ctx.checks.contains(c))
                    .collect();
                if missing.is_empty() {
                    self.set_phase(Phase::IntroRecording, fx);
                } else {
                    self.advise(Advisory::ChecksPending { missing }, fx);
                }
            }
            Phase::IntroRecording => match self.ctx.timer.stop_recording() {
                Some(elapsed) => self.finish_intro_recording(elapsed, fx),
                None => self.advise(Advisory::IntroRecordingPending, fx),
            },
            Phase::TestIntro => self.enter_active(fx),
            Phase::Active => {
                if self.ctx.session.as_ref().is_some_and(|s| !s.is_complete()) {
                    self.advance_item(fx);
                }
            }
            Phase::Finished => {
                return Err(SessionError::InvalidEvent {
                    phase: Phase::Finished,
                    event: Event::Advance.name(),
                })
            }
        }
        Ok(())
    }

    fn set_phase(&mut self, to: Phase, fx: &mut Vec<Effect>) {
        let from = self.ctx.phase;
        self.ctx.phase = to;
        tracing::debug!("phase {from} -> {to}");
        fx.push(Effect::PhaseChanged { from, to });
    }

    fn advise(&mut self, advisory: Advisory, fx: &mut Vec<Effect>) {
        tracing::debug!("advisory: {advisory}");
        self.ctx.advisories.push(advisory.clone());
        fx.push(Effect::Advisory(advisory));
    }

    // -- introduction recording ----------------------------------------------

    fn start_intro_recording(&mut self, fx: &mut Vec<Effect>) {
        if self.ctx.timer.is_recording() {
            return;
        }
        let secs = self.ctx.timer.config().intro_recording_secs;
        self.ctx.timer.start_window(secs);
        fx.push(Effect::PlayCue);
        self.start_capture(CaptureTarget::IntroRecording, fx);
    }

    fn finish_intro_recording(&mut self, elapsed: u32, fx: &mut Vec<Effect>) {
        self.ctx.timer.clear();
        let audio = self.close_capture(CaptureTarget::IntroRecording, elapsed, fx);
        self.ctx.intro_recording = Some(audio);
        self.set_phase(Phase::TestIntro, fx);
    }

    // -- active phase ----------------------------------------------------------

    /// Generate the item list unless this attempt already has one.
    fn enter_active(&mut self, fx: &mut Vec<Effect>) {
        if self.ctx.phase != Phase::Active {
            self.set_phase(Phase::Active, fx);
        }
        if self.ctx.session.is_some() {
            return;
        }
        let items = self.generator.generate(self.pool.as_ref());
        self.ctx.responses.clear();
        let session = TestSession::new(items);
        tracing::info!(
            "session {} started with {} items",
            session.id,
            session.items.len()
        );
        self.ctx.session = Some(session);

        if self.ctx.session.as_ref().is_some_and(|s| !s.is_complete()) {
            self.begin_item(fx);
        } else {
            self.ctx.finish_requested = true;
            self.try_finish(fx);
        }
    }

    fn begin_item(&mut self, fx: &mut Vec<Effect>) {
        let Some(session) = self.ctx.session.as_ref() else {
            return;
        };
        let index = session.current;
        let total = session.items.len();
        let Some(item) = session.current_item().cloned() else {
            return;
        };

        self.ctx.timer.start_item(index, &item);
        fx.push(Effect::ItemStarted {
            index,
            total,
            item_id: item.id.clone(),
            kind: item.kind,
        });
        if item.kind.plays_audio() {
            if let Some(script) = item.audio_script {
                fx.push(Effect::Speak(script));
            }
        }
    }

    /// Persist what the current item has, seal it, and drop its timer.
    fn close_current_item(&mut self, fx: &mut Vec<Effect>) {
        let Some(item) = self.current_item().cloned() else {
            return;
        };
        if let Some(elapsed) = self.ctx.timer.stop_recording() {
            self.persist_recording(&item, elapsed, fx);
        }
        self.ctx.responses.seal(&item.id);
        self.ctx.timer.clear();
        fx.push(Effect::CancelSpeech);
    }

    fn advance_item(&mut self, fx: &mut Vec<Effect>) {
        self.close_current_item(fx);
        let Some(session) = self.ctx.session.as_mut() else {
            return;
        };
        session.current += 1;
        if session.is_complete() {
            self.ctx.finish_requested = true;
            self.try_finish(fx);
        } else {
            self.begin_item(fx);
        }
    }

    fn on_tick(&mut self, fx: &mut Vec<Effect>) {
        match self.ctx.phase {
            Phase::IntroRecording => {
                for signal in self.ctx.timer.tick() {
                    if let TimerSignal::RecordFinished { elapsed } = signal {
                        self.finish_intro_recording(elapsed, fx);
                    }
                }
            }
            Phase::Active => {
                let Some(item) = self.current_item().cloned() else {
                    return;
                };
                for signal in self.ctx.timer.tick() {
                    match signal {
                        TimerSignal::TimeWarning { elapsed } => self.advise(
                            Advisory::TimeManagement {
                                item_id: item.id.clone(),
                                elapsed_secs: elapsed,
                            },
                            fx,
                        ),
                        TimerSignal::Expired { .. } => {
                            self.advise(
                                Advisory::ItemTimedOut {
                                    item_id: item.id.clone(),
                                },
                                fx,
                            );
                            self.advance_item(fx);
                        }
                        TimerSignal::PrepareFinished => {
                            fx.push(Effect::PlayCue);
                            self.start_capture(CaptureTarget::Item(item.id.clone()), fx);
                        }
                        TimerSignal::RecordFinished { elapsed } => {
                            self.persist_recording(&item, elapsed, fx);
                            self.advance_item(fx);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn start_item_recording(&mut self, fx: &mut Vec<Effect>) -> Result<(), SessionError> {
        let item = self.recordable_item()?;
        if self.ctx.timer.is_recording() {
            return Ok(());
        }
        if !self.ctx.timer.begin_recording() {
            return Err(SessionError::InvalidEvent {
                phase: Phase::Active,
                event: Event::StartRecording.name(),
            });
        }
        fx.push(Effect::PlayCue);
        self.start_capture(CaptureTarget::Item(item.id), fx);
        Ok(())
    }

    /// Stop early; the item stays on screen until the candidate advances.
    fn stop_item_recording(&mut self, fx: &mut Vec<Effect>) -> Result<(), SessionError> {
        let item = self.recordable_item()?;
        let Some(elapsed) = self.ctx.timer.stop_recording() else {
            return Err(SessionError::InvalidEvent {
                phase: Phase::Active,
                event: Event::StopRecording.name(),
            });
        };
        self.persist_recording(&item, elapsed, fx);
        Ok(())
    }

    fn recordable_item(&self) -> Result<Item, SessionError> {
        let item = self
            .current_item()
            .ok_or(SessionError::InvalidEvent {
                phase: Phase::Active,
                event: Event::StartRecording.name(),
            })?;
        if !item.kind.is_spoken() {
            return Err(SessionError::NotRecordable {
                item_id: item.id.clone(),
                section: item.section,
            });
        }
        Ok(item.clone())
    }

    fn submit(&mut self, item_id: &str, response: Response) -> Result<(), SessionError> {
        let session = self
            .ctx
            .session
            .as_ref()
            .ok_or_else(|| SessionError::UnknownItem(item_id.to_string()))?;
        let item = session.open_item(item_id)?;
        if matches!(response, Response::Audio(_)) {
            return Err(SessionError::AudioNotSubmittable(item.id.clone()));
        }
        self.ctx.responses.submit(item, response)
    }

    fn fill_blank(&mut self, item_id: &str, index: usize, value: String) -> Result<(), SessionError> {
        let session = self
            .ctx
            .session
            .as_ref()
            .ok_or_else(|| SessionError::UnknownItem(item_id.to_string()))?;
        let item = session.open_item(item_id)?;
        self.ctx.responses.fill_blank(item, index, value)
    }

    // -- capture bookkeeping -------------------------------------------------

    fn start_capture(&mut self, target: CaptureTarget, fx: &mut Vec<Effect>) {
        self.stop_live_capture(fx);
        self.ctx.failed_capture = None;
        self.ctx.live_capture = Some(target.clone());
        fx.push(Effect::StartCapture(target));
    }

    fn stop_live_capture(&mut self, fx: &mut Vec<Effect>) {
        if let Some(target) = self.ctx.live_capture.take() {
            fx.push(Effect::StopCapture(target.clone()));
            self.ctx.stopping.push(target);
        }
    }

    /// End a recording window. Returns a pending response when a capture is
    /// live, or the placeholder when the device failed.
    fn close_capture(
        &mut self,
        target: CaptureTarget,
        elapsed: u32,
        fx: &mut Vec<Effect>,
    ) -> AudioResponse {
        if self.ctx.live_capture.as_ref() == Some(&target) {
            self.stop_live_capture(fx);
            AudioResponse::pending(elapsed)
        } else {
            if self.ctx.failed_capture.as_ref() == Some(&target) {
                self.ctx.failed_capture = None;
            }
            AudioResponse::placeholder(elapsed)
        }
    }

    fn persist_recording(&mut self, item: &Item, elapsed: u32, fx: &mut Vec<Effect>) {
        let audio = self.close_capture(CaptureTarget::Item(item.id.clone()), elapsed, fx);
        if let Err(err) = self.ctx.responses.record_audio(item, audio) {
            tracing::warn!("could not store recording for {}: {err}", item.id);
        }
    }

    fn take_stopping(&mut self, target: &CaptureTarget) -> bool {
        match self.ctx.stopping.iter().position(|t| t == target) {
            Some(pos) => {
                self.ctx.stopping.remove(pos);
                true
            }
            None => false,
        }
    }

    fn on_capture_completed(
        &mut self,
        target: CaptureTarget,
        handle: AudioHandle,
        fx: &mut Vec<Effect>,
    ) {
        if !self.take_stopping(&target) {
            tracing::debug!("ignoring stale capture for {target}");
            return;
        }
        match &target {
            CaptureTarget::IntroRecording => {
                if let Some(intro) = self.ctx.intro_recording.take() {
                    self.ctx.intro_recording = Some(intro.with_handle(handle));
                }
            }
            CaptureTarget::Item(id) => {
                if !self.ctx.responses.attach_capture(id, handle) {
                    tracing::warn!("capture for {id} arrived without a pending response");
                }
            }
        }
        self.try_finish(fx);
    }

    fn on_capture_unavailable(&mut self, target: CaptureTarget, fx: &mut Vec<Effect>) {
        if self.ctx.live_capture.as_ref() == Some(&target) {
            self.ctx.live_capture = None;
            self.ctx.failed_capture = Some(target.clone());
        } else if self.take_stopping(&target) {
            match &target {
                CaptureTarget::IntroRecording => {
                    if let Some(intro) = self.ctx.intro_recording.take() {
                        self.ctx.intro_recording =
                            Some(AudioResponse::placeholder(intro.duration_secs));
                    }
                }
                CaptureTarget::Item(id) => {
                    self.ctx.responses.mark_placeholder(id);
                }
            }
        } else {
            tracing::debug!("ignoring stale capture failure for {target}");
            return;
        }
        self.advise(Advisory::MicrophoneUnavailable { target }, fx);
        self.try_finish(fx);
    }

    // -- finishing -------------------------------------------------------------

    fn finalize(&mut self, fx: &mut Vec<Effect>) {
        if self.ctx.phase == Phase::Finished {
            self.score(fx);
            return;
        }
        self.close_current_item(fx);
        if let Some(session) = self.ctx.session.as_mut() {
            session.current = session.items.len();
        }
        self.ctx.finish_requested = true;
        self.try_finish(fx);
    }

    /// Enter `finished` once no capture outcome is outstanding.
    fn try_finish(&mut self, fx: &mut Vec<Effect>) {
        if !self.ctx.finish_requested || self.capture_pending() {
            return;
        }
        self.ctx.finish_requested = false;
        self.ctx.timer.clear();
        self.set_phase(Phase::Finished, fx);
        self.score(fx);
    }

    fn score(&mut self, fx: &mut Vec<Effect>) {
        let Some(session) = self.ctx.session.as_ref() else {
            return;
        };
        let results = self.pipeline.score_all(&session.items, &self.ctx.responses);
        let aggregate = aggregate(&results);
        tracing::info!(
            "session {} scored: overall {} ({}/{})",
            session.id,
            aggregate.overall,
            aggregate.achieved,
            aggregate.max
        );

        fx.push(Effect::SessionFinished {
            session_id: session.id,
            overall: aggregate.overall,
        });
        self.ctx.report = Some(SessionReport {
            session_id: session.id,
            created_at: Utc::now(),
            started_at: session.started_at,
            candidate: self.ctx.candidate.clone(),
            items: session.items.clone(),
            results,
            aggregate,
            advisories: self.ctx.advisories.clone(),
            intro_recording: self.ctx.intro_recording.clone(),
        });
    }

    /// Candidate details carry over; everything else starts fresh.
    fn retake(&mut self, fx: &mut Vec<Effect>) {
        self.stop_live_capture(fx);
        fx.push(Effect::CancelSpeech);
        let timing = self.ctx.timer.config().clone();
        let candidate = self.ctx.candidate.take();
        self.ctx = SessionContext::new(timing);
        self.ctx.candidate = candidate;
        tracing::info!("retake requested");
        fx.push(Effect::PhaseChanged {
            from: Phase::Finished,
            to: Phase::Intro,
        });
    }
}
