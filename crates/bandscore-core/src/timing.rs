//! Countdown state machine driven by one-second ticks.
//!
//! The engine holds at most one live countdown: a plain item timer, the
//! prepare/record pair of a spoken item, or a standalone recording window.
//! It never touches a clock; callers feed it ticks.

use serde::{Deserialize, Serialize};

use crate::model::{Item, Section, SpeakingClass};

/// Timer durations, all in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Countdown for non-spoken items without their own limit.
    pub default_item_secs: u32,
    /// Elapsed time on a reading item that triggers the time-management warning.
    pub reading_warning_secs: u32,
    /// Length of the introductory recording.
    pub intro_recording_secs: u32,
    pub repeat_prepare_secs: u32,
    pub repeat_record_secs: u32,
    pub extended_prepare_secs: u32,
    pub extended_record_secs: u32,
    /// Wall-clock length of one tick for live runs, in milliseconds.
    pub tick_millis: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_item_secs: 120,
            reading_warning_secs: 60,
            intro_recording_secs: 25,
            repeat_prepare_secs: 3,
            repeat_record_secs: 10,
            extended_prepare_secs: 40,
            extended_record_secs: 40,
            tick_millis: 1000,
        }
    }
}

impl TimingConfig {
    /// Prepare and record durations for a spoken kind.
    pub fn speaking_windows(&self, class: SpeakingClass) -> (u32, u32) {
        match class {
            SpeakingClass::Repeat => (self.repeat_prepare_secs, self.repeat_record_secs),
            SpeakingClass::Extended => (self.extended_prepare_secs, self.extended_record_secs),
        }
    }

    pub fn item_limit(&self, item: &Item) -> u32 {
        item.time_limit_secs.unwrap_or(self.default_item_secs)
    }
}

/// The live countdown, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "kebab-case")]
pub enum TimerState {
    Idle,
    Countdown { remaining: u32, elapsed: u32 },
    Prepare { remaining: u32 },
    Record { remaining: u32, elapsed: u32 },
}

/// Something a tick caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// An item countdown reached zero.
    Expired { elapsed: u32 },
    /// The one-time reading warning threshold was crossed.
    TimeWarning { elapsed: u32 },
    /// Preparation ended; recording has begun.
    PrepareFinished,
    /// The record window ran out.
    RecordFinished { elapsed: u32 },
}

#[derive(Debug, Clone)]
pub struct TimingEngine {
    config: TimingConfig,
    state: TimerState,
    item_index: Option<usize>,
    record_secs: u32,
    warn_at: Option<u32>,
}

impl TimingEngine {
    pub fn new(config: TimingConfig) -> Self {
        Self {
            config,
            state: TimerState::Idle,
            item_index: None,
            record_secs: 0,
            warn_at: None,
        }
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Index of the item the live countdown belongs to.
    pub fn item_index(&self) -> Option<usize> {
        self.item_index
    }

    /// Replace whatever was running with a fresh timer for `item`.
    pub fn start_item(&mut self, index: usize, item: &Item) {
        self.clear();
        self.item_index = Some(index);

        match item.kind.speaking_class() {
            Some(class) => {
                let (prepare, record) = self.config.speaking_windows(class);
                self.record_secs = record;
                self.state = TimerState::Prepare { remaining: prepare };
            }
            None => {
                self.state = TimerState::Countdown {
                    remaining: self.config.item_limit(item),
                    elapsed: 0,
                };
                if item.section == Section::Reading {
                    self.warn_at = Some(self.config.reading_warning_secs);
                }
            }
        }
        tracing::debug!(index, state = ?self.state, "timer started");
    }

    /// Start a standalone recording window not tied to an item.
    pub fn start_window(&mut self, secs: u32) {
        self.clear();
        self.record_secs = secs;
        self.state = TimerState::Record {
            remaining: secs,
            elapsed: 0,
        };
    }

    /// Advance one second.
    pub fn tick(&mut self) -> Vec<TimerSignal> {
        let mut signals = Vec::new();

        match self.state {
            TimerState::Idle => {}
            TimerState::Countdown { remaining, elapsed } => {
                let remaining = remaining.saturating_sub(1);
                let elapsed = elapsed + 1;
                if self.warn_at.is_some_and(|at| elapsed >= at) {
                    self.warn_at = None;
                    signals.push(TimerSignal::TimeWarning { elapsed });
                }
                if remaining == 0 {
                    self.state = TimerState::Idle;
                    signals.push(TimerSignal::Expired { elapsed });
                } else {
                    self.state = TimerState::Countdown { remaining, elapsed };
                }
            }
            TimerState::Prepare { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.state = TimerState::Record {
                        remaining: self.record_secs,
                        elapsed: 0,
                    };
                    signals.push(TimerSignal::PrepareFinished);
                } else {
                    self.state = TimerState::Prepare { remaining };
                }
            }
            TimerState::Record { remaining, elapsed } => {
                let remaining = remaining.saturating_sub(1);
                let elapsed = elapsed + 1;
                if remaining == 0 {
                    self.state = TimerState::Idle;
                    signals.push(TimerSignal::RecordFinished { elapsed });
                } else {
                    self.state = TimerState::Record { remaining, elapsed };
                }
            }
        }

        signals
    }

    /// Skip the rest of the prepare phase. Returns `false` outside prepare.
    pub fn begin_recording(&mut self) -> bool {
        if let TimerState::Prepare { .. } = self.state {
            self.state = TimerState::Record {
                remaining: self.record_secs,
                elapsed: 0,
            };
            true
        } else {
            false
        }
    }

    /// End the record phase early, returning the seconds recorded.
    pub fn stop_recording(&mut self) -> Option<u32> {
        if let TimerState::Record { elapsed, .. } = self.state {
            self.state = TimerState::Idle;
            Some(elapsed)
        } else {
            None
        }
    }

    /// Drop the live countdown and every per-item flag.
    pub fn clear(&mut self) {
        self.state = TimerState::Idle;
        self.item_index = None;
        self.record_secs = 0;
        self.warn_at = None;
    }

    /// Number of live countdowns: zero or one.
    pub fn active_countdowns(&self) -> usize {
        usize::from(self.state != TimerState::Idle)
    }

    pub fn remaining(&self) -> Option<u32> {
        match self.state {
            TimerState::Idle => None,
            TimerState::Countdown { remaining, .. }
            | TimerState::Prepare { remaining }
            | TimerState::Record { remaining, .. } => Some(remaining),
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, TimerState::Record { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemKind;

    fn run(timer: &mut TimingEngine, ticks: u32) -> Vec<TimerSignal> {
        (0..ticks).flat_map(|_| timer.tick()).collect()
    }

    #[test]
    fn countdown_expires_at_limit() {
        let mut timer = TimingEngine::new(TimingConfig::default());
        let item = Item::new("wfd-1", ItemKind::WriteFromDictation, "Type it").with_time_limit(5);
        timer.start_item(0, &item);

        assert!(run(&mut timer, 4).is_empty());
        assert_eq!(timer.remaining(), Some(1));
        assert_eq!(timer.tick(), vec![TimerSignal::Expired { elapsed: 5 }]);
        assert_eq!(timer.state(), TimerState::Idle);
        assert!(timer.tick().is_empty());
    }

    #[test]
    fn default_limit_is_two_minutes() {
        let mut timer = TimingEngine::new(TimingConfig::default());
        timer.start_item(0, &Item::new("we-1", ItemKind::WriteEssay, "Discuss"));
        assert_eq!(timer.remaining(), Some(120));
    }

    #[test]
    fn reading_warning_fires_once_without_touching_timer() {
        let mut timer = TimingEngine::new(TimingConfig::default());
        let item = Item::new("mcs-1", ItemKind::MultipleChoiceSingle, "Pick one");
        timer.start_item(0, &item);

        let signals = run(&mut timer, 61);
        assert_eq!(signals, vec![TimerSignal::TimeWarning { elapsed: 60 }]);
        assert_eq!(
            timer.state(),
            TimerState::Countdown {
                remaining: 59,
                elapsed: 61
            }
        );
        let rest = run(&mut timer, 59);
        assert_eq!(rest, vec![TimerSignal::Expired { elapsed: 120 }]);
    }

    #[test]
    fn listening_items_get_no_warning() {
        let mut timer = TimingEngine::new(TimingConfig::default());
        let item = Item::new("smw-1", ItemKind::SelectMissingWord, "Pick the word");
        timer.start_item(0, &item);
        let signals = run(&mut timer, 120);
        assert_eq!(signals, vec![TimerSignal::Expired { elapsed: 120 }]);
    }

    #[test]
    fn repeat_item_prepares_three_then_records_ten() {
        let mut timer = TimingEngine::new(TimingConfig::default());
        timer.start_item(2, &Item::new("rs-1", ItemKind::RepeatSentence, "Repeat"));
        assert_eq!(timer.state(), TimerState::Prepare { remaining: 3 });

        assert!(run(&mut timer, 2).is_empty());
        assert_eq!(timer.tick(), vec![TimerSignal::PrepareFinished]);
        assert_eq!(
            timer.state(),
            TimerState::Record {
                remaining: 10,
                elapsed: 0
            }
        );

        assert!(run(&mut timer, 9).is_empty());
        assert_eq!(timer.tick(), vec![TimerSignal::RecordFinished { elapsed: 10 }]);
        assert_eq!(timer.active_countdowns(), 0);
    }

    #[test]
    fn extended_item_uses_forty_second_windows() {
        let mut timer = TimingEngine::new(TimingConfig::default());
        timer.start_item(0, &Item::new("di-1", ItemKind::DescribeImage, "Describe"));
        let signals = run(&mut timer, 80);
        assert_eq!(
            signals,
            vec![
                TimerSignal::PrepareFinished,
                TimerSignal::RecordFinished { elapsed: 40 }
            ]
        );
    }

    #[test]
    fn manual_start_and_stop() {
        let mut timer = TimingEngine::new(TimingConfig::default());
        timer.start_item(0, &Item::new("ra-1", ItemKind::ReadAloud, "Read"));
        assert_eq!(timer.stop_recording(), None);
        assert!(timer.begin_recording());
        assert!(!timer.begin_recording());
        run(&mut timer, 7);
        assert_eq!(timer.stop_recording(), Some(7));
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn restart_replaces_live_countdown() {
        let mut timer = TimingEngine::new(TimingConfig::default());
        timer.start_item(0, &Item::new("ra-1", ItemKind::ReadAloud, "Read"));
        run(&mut timer, 45);
        assert!(timer.is_recording());

        timer.start_item(1, &Item::new("mcs-1", ItemKind::MultipleChoiceSingle, "Pick"));
        assert_eq!(timer.active_countdowns(), 1);
        assert_eq!(timer.item_index(), Some(1));
        assert_eq!(
            timer.state(),
            TimerState::Countdown {
                remaining: 120,
                elapsed: 0
            }
        );
    }

    #[test]
    fn standalone_window() {
        let mut timer = TimingEngine::new(TimingConfig::default());
        timer.start_window(3);
        assert_eq!(timer.item_index(), None);
        let signals = run(&mut timer, 3);
        assert_eq!(signals, vec![TimerSignal::RecordFinished { elapsed: 3 }]);
    }
}
