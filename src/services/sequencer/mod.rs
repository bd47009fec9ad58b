//! Stage sequencer - the sequential acquisition state machine
//!
//! Walks the fixed stage sequence, consuming sensor readings for the current
//! stage only, gating advancement on the stability score, enforcing the
//! per-stage timeout, and submitting the aggregated results exactly once.
//!
//! One task owns the whole session: `run()` is a select loop over the stream
//! event channel, the 1-second tick and the live timeout deadline, so every
//! state mutation happens in a single event-loop turn and the guard/latch
//! check-and-set steps need no locking.

#[cfg(test)]
mod tests;

use crate::domain::result::{new_session_id, SessionResult};
use crate::domain::types::{Reading, SessionOutcome, StageId, StreamEvent, STAGE_SEQUENCE};
use crate::infra::config::Config;
use crate::io::session_store::SessionStore;
use crate::io::submit::ResultSubmitter;
use crate::services::stability::StabilityAccumulator;
use crate::services::submission::SubmissionGuard;
use crate::services::timeout::TimeoutSupervisor;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep_until, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Tick cadence for stability decay and display updates
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Session phase: one measuring state per stage plus the terminal states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Measuring(StageId),
    Submitting,
    Completed,
    Failed,
}

pub struct StageSequencer {
    session_id: String,
    sequence: &'static [StageId],
    stage_index: usize,
    phase: SessionPhase,
    stability: StabilityAccumulator,
    timeout: TimeoutSupervisor,
    guard: SubmissionGuard,
    result: SessionResult,
    submitter: ResultSubmitter,
    store: SessionStore,
    /// Teardown signal for the stream client. Only the sequencer fires it,
    /// and always before the result is considered final.
    stream_teardown: watch::Sender<bool>,
}

impl StageSequencer {
    pub fn new(
        config: &Config,
        submitter: ResultSubmitter,
        store: SessionStore,
        stream_teardown: watch::Sender<bool>,
    ) -> Self {
        let now = Instant::now();
        Self {
            session_id: new_session_id(),
            sequence: &STAGE_SEQUENCE,
            stage_index: 0,
            phase: SessionPhase::Measuring(STAGE_SEQUENCE[0]),
            stability: StabilityAccumulator::new(config.max_stability()),
            timeout: TimeoutSupervisor::new(config.stage_timeout(), now),
            guard: SubmissionGuard::new(),
            result: SessionResult::new(),
            submitter,
            store,
            stream_teardown,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The stage currently acquiring, None once terminal
    pub fn current_stage(&self) -> Option<StageId> {
        match self.phase {
            SessionPhase::Measuring(stage) => Some(stage),
            _ => None,
        }
    }

    /// Finalized values accumulated so far (display layer)
    pub fn result(&self) -> &SessionResult {
        &self.result
    }

    /// Stability progress 0-100 (display layer)
    pub fn stability_percent(&self) -> u32 {
        self.stability.percent()
    }

    /// Countdown until the live stage deadline (display layer)
    pub fn seconds_left(&self, now: Instant) -> u64 {
        self.timeout.seconds_left(now)
    }

    /// Tear the stream down on an external exit path (navigation away)
    pub fn teardown(&self) {
        let _ = self.stream_teardown.send(true);
    }

    /// Run the session to a terminal outcome, consuming stream events
    pub async fn run(&mut self, mut event_rx: mpsc::Receiver<StreamEvent>) -> SessionOutcome {
        let now = Instant::now();
        self.timeout.arm(now);
        info!(
            session_id = %self.session_id,
            stage = %self.sequence[self.stage_index],
            stages = %self.sequence.len(),
            "session_started"
        );

        let mut tick = interval_at(now + TICK_INTERVAL, TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(StreamEvent::Reading(reading)) => {
                            if self.on_reading(reading) {
                                if let Some(outcome) = self.advance(Instant::now()).await {
                                    return outcome;
                                }
                            }
                        }
                        // A missing transport is a stronger signal than a
                        // quiet one: escalate without waiting out the timer.
                        Some(StreamEvent::ConnectionLost) | None => {
                            return self.escalate(SessionOutcome::Disconnected);
                        }
                    }
                }
                _ = sleep_until(self.timeout.deadline()) => {
                    if self.timeout.expire(Instant::now()) {
                        return self.escalate(SessionOutcome::TimedOut);
                    }
                }
                _ = tick.tick() => {
                    self.on_tick(Instant::now());
                }
            }
        }
    }

    /// Accept or drop a reading. Returns true when the current stage just
    /// reached full stability (edge-triggered).
    pub fn on_reading(&mut self, reading: Reading) -> bool {
        let SessionPhase::Measuring(stage) = self.phase else {
            debug!(stage = %reading.stage, "reading_dropped_terminal");
            return false;
        };
        if reading.stage != stage {
            // Late events from a previous stage are dropped, never queued
            debug!(stage = %reading.stage, current = %stage, "reading_dropped_stale");
            return false;
        }

        self.result.record(stage, &reading.value);
        self.timeout.reset(reading.received_at);
        let completed = self.stability.on_reading(reading.received_at);

        debug!(
            session_id = %self.session_id,
            stage = %stage,
            value = %reading.value,
            unit = %stage.unit(),
            stability_pct = %self.stability.percent(),
            "reading_accepted"
        );
        completed
    }

    /// 1-second cadence: decay stability and log progress for the display
    pub fn on_tick(&mut self, now: Instant) {
        if let SessionPhase::Measuring(stage) = self.phase {
            self.stability.tick(now);
            debug!(
                stage = %stage,
                stability_pct = %self.stability.percent(),
                seconds_left = %self.timeout.seconds_left(now),
                "acquisition_tick"
            );
        }
    }

    /// Move to the next stage, or submit when the sequence is exhausted.
    /// Returns Some when the session reached a terminal outcome.
    pub async fn advance(&mut self, now: Instant) -> Option<SessionOutcome> {
        if self.stage_index + 1 < self.sequence.len() {
            self.stage_index += 1;
            let stage = self.sequence[self.stage_index];
            self.phase = SessionPhase::Measuring(stage);
            // Score and deadline reset together with the transition; the
            // previous stage's deadline is dead from this point on.
            self.stability.reset();
            self.timeout.arm(now);
            info!(
                session_id = %self.session_id,
                stage = %stage,
                title = %stage.title(),
                "stage_advanced"
            );
            None
        } else {
            self.submit_results().await
        }
    }

    /// Submit the finalized results at most once. A duplicate trigger while
    /// a submission is in flight or done is a no-op (returns None).
    pub async fn submit_results(&mut self) -> Option<SessionOutcome> {
        if !self.guard.begin() {
            debug!(session_id = %self.session_id, "submit_duplicate_ignored");
            return None;
        }
        self.phase = SessionPhase::Submitting;

        // Tear the stream down first so no late reading can mutate the
        // result once it is considered final.
        let _ = self.stream_teardown.send(true);

        let Some(face_id) = self.store.load_identity_token() else {
            // Fatal precondition: the guard stays latched, there is no retry
            // path short of restarting from identification.
            error!(session_id = %self.session_id, "identity_token_missing");
            self.phase = SessionPhase::Failed;
            return Some(SessionOutcome::IdentityMissing);
        };

        let Some(payload) = self.result.finalize(&face_id) else {
            // Unreachable when every stage completed; treated as submit failure
            error!(session_id = %self.session_id, "session_result_incomplete");
            self.guard.fail();
            self.phase = SessionPhase::Failed;
            return Some(SessionOutcome::SubmitFailed);
        };

        match self.submitter.submit(&payload).await {
            Ok(()) => {
                if let Some(snapshot) = self.result.snapshot() {
                    if let Err(e) = self.store.write_snapshot(&snapshot) {
                        // The endpoint has the results; a snapshot write
                        // failure only degrades the completion view.
                        error!(session_id = %self.session_id, error = %e, "snapshot_write_failed");
                    }
                }
                self.phase = SessionPhase::Completed;
                info!(session_id = %self.session_id, "session_completed");
                Some(SessionOutcome::Completed)
            }
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "submission_failed");
                // Revert the latch; the captured data stays valid and an
                // explicit user action may retry.
                self.guard.fail();
                self.phase = SessionPhase::Measuring(self.sequence[self.stage_index]);
                Some(SessionOutcome::SubmitFailed)
            }
        }
    }

    /// One-shot terminal escalation: fixed operator message, stream torn down
    fn escalate(&mut self, outcome: SessionOutcome) -> SessionOutcome {
        self.phase = SessionPhase::Failed;
        let _ = self.stream_teardown.send(true);
        error!(
            session_id = %self.session_id,
            outcome = %outcome.as_str(),
            message = %outcome.message(),
            "session_escalated"
        );
        outcome
    }
}
