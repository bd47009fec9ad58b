//! Submission guard - at-most-once latch for the results request
//!
//! This is a latch, not a lock: the check-and-set in `begin()` is a single
//! step, atomic by construction because one task owns the session state.
//! The explicit flag is still required because multiple logical triggers
//! (last-stage completion, duplicate events, an explicit retry) can arrive
//! across separate event-loop turns.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
}

#[derive(Debug)]
pub struct SubmissionGuard {
    state: SubmissionState,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self { state: SubmissionState::Idle }
    }

    /// Claim the latch. True exactly when the caller won it; false for every
    /// duplicate trigger while a submission is in flight or done.
    pub fn begin(&mut self) -> bool {
        if self.state == SubmissionState::Submitting {
            return false;
        }
        self.state = SubmissionState::Submitting;
        true
    }

    /// Revert after a failed request so an explicit retry can run later.
    /// This is the only transition back to idle.
    pub fn fail(&mut self) {
        self.state = SubmissionState::Idle;
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn is_submitting(&self) -> bool {
        self.state == SubmissionState::Submitting
    }
}

impl Default for SubmissionGuard {
    fn default() -> Self {
        Self::new()
    }
}
