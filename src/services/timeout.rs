//! Per-stage timeout supervision with latched escalation
//!
//! A single absolute deadline is live at any time; re-arming replaces it,
//! never merges. Expiry is latched so a flood of near-simultaneous timer
//! wakeups escalates exactly once per stage.

use tokio::time::{Duration, Instant};

#[derive(Debug)]
pub struct TimeoutSupervisor {
    budget: Duration,
    deadline: Instant,
    expired: bool,
}

impl TimeoutSupervisor {
    pub fn new(budget: Duration, now: Instant) -> Self {
        Self { budget, deadline: now + budget, expired: false }
    }

    /// Arm a fresh budget and clear the latch (session start, stage transition)
    pub fn arm(&mut self, now: Instant) {
        self.deadline = now + self.budget;
        self.expired = false;
    }

    /// Replace the live deadline with a fresh budget from `now`.
    /// Called on every accepted reading; earlier deadlines are dead.
    pub fn reset(&mut self, now: Instant) {
        self.deadline = now + self.budget;
    }

    /// The only live deadline; the event loop sleeps on this
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Latch an expiry. True only for the first call at or past the deadline;
    /// repeated wakeups and stale timers return false.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.expired || now < self.deadline {
            return false;
        }
        self.expired = true;
        true
    }

    pub fn has_expired(&self) -> bool {
        self.expired
    }

    /// Whole seconds remaining until the live deadline (display countdown)
    pub fn seconds_left(&self, now: Instant) -> u64 {
        self.deadline.saturating_duration_since(now).as_secs()
    }
}
