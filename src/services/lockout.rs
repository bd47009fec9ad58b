//! Attempt lockout for face verification
//!
//! Counts consecutive verification failures and locks the kiosk out once a
//! threshold is crossed. The lock clears itself after the cool-down, and a
//! successful verification resets the counter.

use tokio::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug)]
pub struct AttemptLockout {
    max_attempts: u32,
    cooldown: Duration,
    failures: u32,
    locked_until: Option<Instant>,
}

impl AttemptLockout {
    pub fn new(max_attempts: u32, cooldown: Duration) -> Self {
        Self { max_attempts, cooldown, failures: 0, locked_until: None }
    }

    /// Record a failed verification attempt. Returns true when this failure
    /// crosses the threshold and starts the cool-down. Failures during an
    /// active lockout are not counted.
    pub fn record_failure(&mut self, now: Instant) -> bool {
        if self.is_locked(now) {
            return false;
        }

        self.failures += 1;
        if self.failures >= self.max_attempts {
            self.locked_until = Some(now + self.cooldown);
            warn!(
                failures = %self.failures,
                cooldown_secs = %self.cooldown.as_secs(),
                "verification_locked_out"
            );
            return true;
        }
        false
    }

    /// Locked state, auto-resetting once the cool-down has elapsed
    pub fn is_locked(&mut self, now: Instant) -> bool {
        if let Some(until) = self.locked_until {
            if now < until {
                return true;
            }
            info!("verification_lockout_expired");
            self.locked_until = None;
            self.failures = 0;
        }
        false
    }

    /// Clear the counter after a successful verification
    pub fn reset(&mut self) {
        self.failures = 0;
        self.locked_until = None;
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.failures)
    }
}
