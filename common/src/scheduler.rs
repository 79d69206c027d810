use serde::{Deserialize, Serialize};

use crate::hal::Clock;

pub const TICK_MS: u64 = 1_000;
/// Reducer used when the configured one is outside `0..=1000`.
pub const FALLBACK_REDUCER_MS: u64 = 165;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftCorrection {
    /// Sleep a fixed `1000 - reducer` ms per tick.
    #[default]
    Static,
    /// Sleep until the next whole-second deadline on the monotonic clock.
    Measured,
}

pub fn effective_reducer_ms(configured: i32) -> u64 {
    match u64::try_from(configured) {
        Ok(reducer) if reducer <= TICK_MS => reducer,
        _ => FALLBACK_REDUCER_MS,
    }
}

#[derive(Debug, Clone)]
pub struct DriftCorrectedScheduler {
    mode: DriftCorrection,
    reducer_ms: u64,
    next_deadline_ms: Option<u64>,
}

impl DriftCorrectedScheduler {
    pub fn new(mode: DriftCorrection, configured_reducer_ms: i32) -> Self {
        Self {
            mode,
            reducer_ms: effective_reducer_ms(configured_reducer_ms),
            next_deadline_ms: None,
        }
    }

    pub fn reducer_ms(&self) -> u64 {
        self.reducer_ms
    }

    pub fn static_sleep_ms(&self) -> u64 {
        TICK_MS - self.reducer_ms
    }

    /// Blocks for the remainder of the current tick and returns the time slept.
    pub fn tick<C: Clock>(&mut self, clock: &mut C) -> u64 {
        let sleep_ms = match self.mode {
            DriftCorrection::Static => self.static_sleep_ms(),
            DriftCorrection::Measured => self.measured_sleep_ms(clock.now_ms()),
        };
        clock.sleep_ms(sleep_ms);
        sleep_ms
    }

    fn measured_sleep_ms(&mut self, now_ms: u64) -> u64 {
        let deadline = match self.next_deadline_ms {
            // More than a whole tick behind: drop the missed ticks.
            Some(deadline) if now_ms < deadline + TICK_MS => deadline,
            _ => now_ms + TICK_MS,
        };
        self.next_deadline_ms = Some(deadline + TICK_MS);
        deadline.saturating_sub(now_ms)
    }
}
