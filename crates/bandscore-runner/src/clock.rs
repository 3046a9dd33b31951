//! Tick sources for driving a session.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Something that paces the one-second session tick.
#[async_trait]
pub trait TickSource: Send {
    /// Resolve when the next tick is due.
    async fn next_tick(&mut self);

    /// Session time one tick represents, in milliseconds.
    fn tick_millis(&self) -> u64;
}

/// Wall-clock ticks for live runs. Ticks missed while the runner was busy
/// are skipped rather than delivered in a burst.
pub struct IntervalTicks {
    interval: Interval,
    period: Duration,
}

impl IntervalTicks {
    /// Must be called from within a tokio runtime.
    pub fn new(period: Duration) -> Result<Self> {
        anyhow::ensure!(!period.is_zero(), "tick period must be non-zero");
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Ok(Self { interval, period })
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    async fn next_tick(&mut self) {
        self.interval.tick().await;
    }

    fn tick_millis(&self) -> u64 {
        self.period.as_millis() as u64
    }
}

/// Ticks that are due immediately, for simulations and tests.
#[derive(Debug, Clone)]
pub struct SyntheticTicks {
    tick_millis: u64,
    delivered: u64,
}

impl SyntheticTicks {
    pub fn new(tick_millis: u64) -> Self {
        Self {
            tick_millis,
            delivered: 0,
        }
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl Default for SyntheticTicks {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl TickSource for SyntheticTicks {
    async fn next_tick(&mut self) {
        self.delivered += 1;
        tokio::task::yield_now().await;
    }

    fn tick_millis(&self) -> u64 {
        self.tick_millis
    }
}
