//! Stability accumulator - decaying confidence score gating stage completion
//!
//! Readings arrive at a rough once-per-second cadence from hardware polling.
//! The score climbs by one unit per accepted reading and decays by one unit
//! per second of silence, so momentary polling jitter does not reset
//! progress but sustained, recent signal is required to reach 100%.

use tokio::time::{Duration, Instant};

/// Window after the last accepted reading during which ticks do not decay
/// the score. Measured from the reading timestamp, not from the last tick.
const DECAY_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct StabilityAccumulator {
    score: u32,
    max: u32,
    last_reading: Option<Instant>,
    /// Completion latch: the 100% signal fires once per stage
    completed: bool,
}

impl StabilityAccumulator {
    pub fn new(max: u32) -> Self {
        Self { score: 0, max, last_reading: None, completed: false }
    }

    /// Accept a reading. Returns true exactly once, at the moment the score
    /// first reaches the maximum (edge-triggered, never level-triggered).
    pub fn on_reading(&mut self, now: Instant) -> bool {
        self.last_reading = Some(now);
        if self.score < self.max {
            self.score += 1;
        }
        if self.score >= self.max && !self.completed {
            self.completed = true;
            return true;
        }
        false
    }

    /// 1-second cadence tick: decay the score by one unless a reading was
    /// accepted within the last window. Floored at zero.
    pub fn tick(&mut self, now: Instant) {
        let recent = self
            .last_reading
            .is_some_and(|at| now.duration_since(at) <= DECAY_WINDOW);
        if !recent && self.score > 0 {
            self.score -= 1;
        }
    }

    /// Reset for a stage transition
    pub fn reset(&mut self) {
        self.score = 0;
        self.last_reading = None;
        self.completed = false;
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Progress for the display layer, 0-100
    pub fn percent(&self) -> u32 {
        if self.max == 0 {
            return 100;
        }
        self.score * 100 / self.max
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }
}
