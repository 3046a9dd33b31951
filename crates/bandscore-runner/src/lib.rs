//! bandscore-runner — Tick-driven session runner.
//!
//! Plays a [`ScriptedCandidate`] through an [`ExamEngine`], delivering the
//! session tick from a [`TickSource`] and advancing the virtual clock the
//! synthetic devices measure against.

pub mod clock;
pub mod script;

use std::sync::Arc;

use anyhow::{Context, Result};

use bandscore_core::engine::ExamEngine;
use bandscore_core::generator::TestGenerator;
use bandscore_core::model::{EquipmentCheck, Item};
use bandscore_core::report::SessionReport;
use bandscore_core::scoring::ScoringPipeline;
use bandscore_core::session::{Event, Phase, SessionController};
use bandscore_core::timing::TimerState;
use bandscore_core::traits::{AudioCapture, ItemPool, SpeechSynthesizer};
use bandscore_devices::{BandscoreConfig, VirtualClock};

pub use clock::{IntervalTicks, SyntheticTicks, TickSource};
pub use script::{Action, ScriptedCandidate};

/// Six hours of one-second ticks.
const DEFAULT_TICK_BUDGET: u64 = 6 * 60 * 60;

/// Build an engine from loaded configuration.
pub fn engine_from_config(
    config: &BandscoreConfig,
    pool: Arc<dyn ItemPool>,
    capture: Box<dyn AudioCapture>,
    speech: Box<dyn SpeechSynthesizer>,
) -> ExamEngine {
    let generator = match config.seed {
        Some(seed) => TestGenerator::seeded(config.blueprint.clone(), seed),
        None => TestGenerator::new(config.blueprint.clone()),
    };
    let controller = SessionController::new(pool, generator)
        .with_pipeline(ScoringPipeline::new(&config.scoring))
        .with_timing(config.timing.clone())
        .with_consent(Arc::new(config.consent));
    ExamEngine::new(controller, capture, speech)
}

/// Drives one engine through complete attempts.
pub struct SessionRunner<T: TickSource> {
    engine: ExamEngine,
    ticks: T,
    clock: VirtualClock,
    tick_budget: u64,
    ticks_used: u64,
}

impl<T: TickSource> SessionRunner<T> {
    pub fn new(engine: ExamEngine, ticks: T, clock: VirtualClock) -> Self {
        Self {
            engine,
            ticks,
            clock,
            tick_budget: DEFAULT_TICK_BUDGET,
            ticks_used: 0,
        }
    }

    /// Fail a run that needs more than `ticks` ticks.
    pub fn with_tick_budget(mut self, ticks: u64) -> Self {
        self.tick_budget = ticks;
        self
    }

    pub fn engine(&self) -> &ExamEngine {
        &self.engine
    }

    /// Ticks delivered across every run so far.
    pub fn ticks_used(&self) -> u64 {
        self.ticks_used
    }

    /// Play `candidate` through a full attempt and return its report.
    ///
    /// A runner whose previous attempt finished starts with a retake.
    pub async fn run(&mut self, candidate: &ScriptedCandidate) -> Result<SessionReport> {
        if self.phase() == Phase::Finished {
            self.engine.dispatch(Event::Retake)?;
        }
        anyhow::ensure!(
            self.phase() == Phase::Intro,
            "cannot start a run during the {} phase",
            self.phase()
        );

        self.onboard(candidate).await?;
        self.answer_items(candidate).await?;

        while self.phase() != Phase::Finished {
            self.tick().await?;
        }
        let report = self
            .engine
            .controller()
            .report()
            .cloned()
            .context("session finished without a report")?;
        tracing::info!(
            "session {} finished: overall band {}",
            report.session_id,
            report.aggregate.overall
        );
        Ok(report)
    }

    /// Everything up to the first item.
    async fn onboard(&mut self, candidate: &ScriptedCandidate) -> Result<()> {
        if candidate.candidate.acknowledge_disclaimer {
            self.act(Event::AcknowledgeDisclaimer);
        }
        self.expect_advance(Phase::CandidateInfo, "the disclaimer was not accepted")?;

        self.act(Event::SubmitCandidateInfo(candidate.candidate_info()));
        self.expect_advance(Phase::TechCheck, "candidate details are incomplete")?;

        for check in EquipmentCheck::ALL {
            self.act(Event::ConfirmCheck(check));
        }
        self.expect_advance(Phase::IntroRecording, "equipment checks are incomplete")?;

        self.act(Event::StartRecording);
        for _ in 0..candidate.candidate.intro_secs {
            if self.phase() != Phase::IntroRecording {
                break;
            }
            self.tick().await?;
        }
        if self.phase() == Phase::IntroRecording {
            self.act(Event::StopRecording);
        }

        self.expect_advance(Phase::Active, "the test did not start")
    }

    async fn answer_items(&mut self, candidate: &ScriptedCandidate) -> Result<()> {
        while self.phase() == Phase::Active {
            let Some((index, item)) = self.current() else {
                // Past the last item, waiting on a capture to complete.
                self.tick().await?;
                continue;
            };
            let dwell = candidate.candidate.dwell_secs;

            match candidate.action_for(&item) {
                Action::Speak(secs) if item.kind.is_spoken() => {
                    self.dwell(index, dwell).await?;
                    if self.on_item(index) && self.in_prepare() {
                        self.act(Event::StartRecording);
                    }
                    // The window may close first; the item then moves on
                    // by itself.
                    for _ in 0..secs {
                        if !self.on_item(index) {
                            break;
                        }
                        self.tick().await?;
                    }
                    if self.on_item(index) && self.engine.controller().timer().is_recording() {
                        self.act(Event::StopRecording);
                    }
                }
                Action::Respond(response) => {
                    self.dwell(index, dwell).await?;
                    if self.on_item(index) {
                        self.act(Event::SubmitResponse {
                            item_id: item.id.clone(),
                            response,
                        });
                    }
                }
                Action::FillBlanks(words) => {
                    self.dwell(index, dwell).await?;
                    if self.on_item(index) {
                        for (blank, word) in words.into_iter().enumerate() {
                            self.act(Event::FillBlank {
                                item_id: item.id.clone(),
                                index: blank,
                                value: word,
                            });
                        }
                    }
                }
                action => {
                    if matches!(action, Action::Speak(_)) {
                        tracing::warn!("{} is not a spoken item; skipping", item.id);
                    }
                    if candidate.candidate.wait_on_unanswered {
                        while self.on_item(index) {
                            self.tick().await?;
                        }
                    }
                }
            }

            if self.on_item(index) {
                self.act(Event::Advance);
            }
        }
        Ok(())
    }

    async fn dwell(&mut self, index: usize, secs: u32) -> Result<()> {
        for _ in 0..secs {
            if !self.on_item(index) {
                break;
            }
            self.tick().await?;
        }
        Ok(())
    }

    async fn tick(&mut self) -> Result<()> {
        anyhow::ensure!(
            self.ticks_used < self.tick_budget,
            "session did not finish within {} ticks",
            self.tick_budget
        );
        self.ticks.next_tick().await;
        self.ticks_used += 1;
        self.clock.advance(self.ticks.tick_millis());
        self.engine.dispatch(Event::Tick)?;
        Ok(())
    }

    /// Apply a candidate action. Rejections are logged by the controller
    /// and do not end the run.
    fn act(&mut self, event: Event) {
        let _ = self.engine.dispatch(event);
    }

    fn expect_advance(&mut self, to: Phase, failure: &str) -> Result<()> {
        self.act(Event::Advance);
        anyhow::ensure!(self.phase() == to, "{failure} (still in {})", self.phase());
        Ok(())
    }

    fn phase(&self) -> Phase {
        self.engine.controller().phase()
    }

    fn current(&self) -> Option<(usize, Item)> {
        let session = self.engine.controller().session()?;
        let item = session.current_item()?.clone();
        Some((session.current, item))
    }

    fn on_item(&self, index: usize) -> bool {
        self.phase() == Phase::Active
            && self
                .engine
                .controller()
                .session()
                .is_some_and(|s| s.current == index)
    }

    fn in_prepare(&self) -> bool {
        matches!(
            self.engine.controller().timer().state(),
            TimerState::Prepare { .. }
        )
    }
}
