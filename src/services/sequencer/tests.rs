//! Tests for the stage sequencer

use super::*;
use crate::domain::types::{Reading, StageId, StreamEvent};
use crate::infra::config::Config;
use crate::io::session_store::SessionStore;
use crate::io::submit::ResultSubmitter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Duration, Instant};

/// Test harness holding the submit call counter, the teardown receiver and
/// the temp directory backing the session store
struct TestSession {
    sequencer: StageSequencer,
    teardown_rx: watch::Receiver<bool>,
    calls: Arc<AtomicUsize>,
    dir: tempfile::TempDir,
}

impl std::ops::Deref for TestSession {
    type Target = StageSequencer;
    fn deref(&self) -> &Self::Target {
        &self.sequencer
    }
}

impl std::ops::DerefMut for TestSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.sequencer
    }
}

fn create_session() -> TestSession {
    create_session_with(Config::default(), false, true)
}

fn create_session_with(config: Config, submit_fails: bool, token_present: bool) -> TestSession {
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("face_id");
    if token_present {
        std::fs::write(&token_file, "visitor-42\n").unwrap();
    }
    let snapshot_file = dir.path().join("results.json");
    let store = SessionStore::new(token_file.to_str().unwrap(), snapshot_file.to_str().unwrap());

    let (submitter, calls) = ResultSubmitter::mock(submit_fails);
    let (teardown_tx, teardown_rx) = watch::channel(false);
    let sequencer = StageSequencer::new(&config, submitter, store, teardown_tx);

    TestSession { sequencer, teardown_rx, calls, dir }
}

fn reading(stage: StageId, value: &str) -> Reading {
    Reading { stage, value: value.to_string(), received_at: Instant::now() }
}

/// Drive a stage to its completion edge by feeding readings
fn complete_stage(session: &mut TestSession, stage: StageId, value: &str) {
    for i in 0..7 {
        let edge = session.on_reading(reading(stage, value));
        assert_eq!(edge, i == 6, "edge must fire exactly at the seventh reading");
    }
}

#[tokio::test]
async fn test_initial_stage_is_first_in_sequence() {
    let session = create_session();
    assert_eq!(session.current_stage(), Some(StageId::Temperature));
    assert_eq!(session.stability_percent(), 0);
}

#[tokio::test]
async fn test_cross_stage_reading_dropped() {
    let mut session = create_session();

    assert!(!session.on_reading(reading(StageId::Alcohol, "0.00")));
    assert!(session.result().value(StageId::Alcohol).is_none());
    assert_eq!(session.stability_percent(), 0);
}

#[tokio::test]
async fn test_last_write_wins_within_stage() {
    let mut session = create_session();

    session.on_reading(reading(StageId::Temperature, "36.2"));
    session.on_reading(reading(StageId::Temperature, "36.6"));
    assert_eq!(session.result().value(StageId::Temperature), Some("36.6"));
}

#[tokio::test]
async fn test_advance_resets_score_and_deadline() {
    let mut session = create_session();
    complete_stage(&mut session, StageId::Temperature, "36.6");
    assert_eq!(session.stability_percent(), 100);

    let now = Instant::now();
    let outcome = session.advance(now).await;

    assert!(outcome.is_none());
    assert_eq!(session.current_stage(), Some(StageId::Alcohol));
    assert_eq!(session.stability_percent(), 0);
    assert_eq!(session.seconds_left(now), 15);
    // Advancing must not tear the stream down
    assert!(!*session.teardown_rx.borrow());
}

#[tokio::test]
async fn test_last_stage_completion_submits_once() {
    let mut session = create_session();
    complete_stage(&mut session, StageId::Temperature, "36.6");
    assert!(session.advance(Instant::now()).await.is_none());
    complete_stage(&mut session, StageId::Alcohol, "0.00");

    let outcome = session.advance(Instant::now()).await;

    assert_eq!(outcome, Some(SessionOutcome::Completed));
    assert_eq!(session.phase(), SessionPhase::Completed);
    assert_eq!(session.calls.load(Ordering::SeqCst), 1);
    // Stream torn down before the request went out
    assert!(*session.teardown_rx.borrow());
}

#[tokio::test]
async fn test_duplicate_submit_triggers_are_noops() {
    let mut session = create_session();
    complete_stage(&mut session, StageId::Temperature, "36.6");
    session.advance(Instant::now()).await;
    complete_stage(&mut session, StageId::Alcohol, "0.00");
    assert_eq!(session.advance(Instant::now()).await, Some(SessionOutcome::Completed));

    // Rapid duplicate triggers across later turns: no second request
    for _ in 0..3 {
        assert!(session.submit_results().await.is_none());
    }
    assert_eq!(session.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_submit_failure_reverts_for_explicit_retry() {
    let mut session = create_session_with(Config::default(), true, true);
    complete_stage(&mut session, StageId::Temperature, "36.6");
    session.advance(Instant::now()).await;
    complete_stage(&mut session, StageId::Alcohol, "0.00");

    let outcome = session.advance(Instant::now()).await;
    assert_eq!(outcome, Some(SessionOutcome::SubmitFailed));
    // Latch reverted: an explicit retry produces a second request
    assert_eq!(session.submit_results().await, Some(SessionOutcome::SubmitFailed));
    assert_eq!(session.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_identity_token_is_fatal() {
    let mut session = create_session_with(Config::default(), false, false);
    complete_stage(&mut session, StageId::Temperature, "36.6");
    session.advance(Instant::now()).await;
    complete_stage(&mut session, StageId::Alcohol, "0.00");

    let outcome = session.advance(Instant::now()).await;

    assert_eq!(outcome, Some(SessionOutcome::IdentityMissing));
    assert_eq!(session.phase(), SessionPhase::Failed);
    assert_eq!(session.calls.load(Ordering::SeqCst), 0);
    // No retry path: the latch stays claimed
    assert!(session.submit_results().await.is_none());
}

#[tokio::test]
async fn test_snapshot_persisted_on_success() {
    let mut session = create_session();
    complete_stage(&mut session, StageId::Temperature, "36.6");
    session.advance(Instant::now()).await;
    complete_stage(&mut session, StageId::Alcohol, "0.00");
    session.advance(Instant::now()).await;

    let raw = std::fs::read_to_string(session.dir.path().join("results.json")).unwrap();
    assert_eq!(raw, r#"{"temperature":"36.6","alcohol":"0.00"}"#);
}

#[tokio::test]
async fn test_readings_dropped_once_terminal() {
    let mut session = create_session();
    complete_stage(&mut session, StageId::Temperature, "36.6");
    session.advance(Instant::now()).await;
    complete_stage(&mut session, StageId::Alcohol, "0.00");
    session.advance(Instant::now()).await;

    // A late reading racing the teardown must not mutate the final result
    assert!(!session.on_reading(reading(StageId::Alcohol, "9.99")));
    assert_eq!(session.result().value(StageId::Alcohol), Some("0.00"));
}

// --- run-loop scenarios under a paused clock ---

fn feed(
    tx: mpsc::Sender<StreamEvent>,
    stages: Vec<(StageId, &'static str, u32)>,
    hold_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        for (stage, value, count) in stages {
            for _ in 0..count {
                time::sleep(Duration::from_secs(1)).await;
                let reading =
                    Reading { stage, value: value.to_string(), received_at: Instant::now() };
                if tx.send(StreamEvent::Reading(reading)).await.is_err() {
                    return;
                }
            }
        }
        // Keep the sender open so channel closure is not mistaken for a
        // transport failure while a stage starves.
        time::sleep(Duration::from_secs(hold_secs)).await;
    })
}

#[tokio::test(start_paused = true)]
async fn test_scenario_both_stages_complete() {
    let mut session = create_session();
    let (tx, rx) = mpsc::channel(64);
    let feeder = feed(
        tx,
        vec![(StageId::Temperature, "36.6", 7), (StageId::Alcohol, "0.00", 7)],
        0,
    );

    let outcome = session.sequencer.run(rx).await;

    assert_eq!(outcome, SessionOutcome::Completed);
    assert_eq!(session.calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.result().value(StageId::Temperature), Some("36.6"));
    assert_eq!(session.result().value(StageId::Alcohol), Some("0.00"));
    assert!(*session.teardown_rx.borrow());
    feeder.abort();
}

#[tokio::test(start_paused = true)]
async fn test_scenario_second_stage_starves() {
    let mut session = create_session();
    let (tx, rx) = mpsc::channel(64);
    // Temperature completes in 7 s, then alcohol never reports; the sender
    // stays open well past the 15 s budget.
    let feeder = feed(tx, vec![(StageId::Temperature, "36.6", 7)], 30);

    let outcome = session.sequencer.run(rx).await;

    assert_eq!(outcome, SessionOutcome::TimedOut);
    assert_eq!(session.phase(), SessionPhase::Failed);
    assert_eq!(session.calls.load(Ordering::SeqCst), 0);
    assert!(*session.teardown_rx.borrow());
    feeder.abort();
}

#[tokio::test(start_paused = true)]
async fn test_scenario_silent_stream_times_out_once() {
    let mut session = create_session();
    let (tx, rx) = mpsc::channel(64);
    let feeder = feed(tx, vec![], 30);

    let start = Instant::now();
    let outcome = session.sequencer.run(rx).await;

    assert_eq!(outcome, SessionOutcome::TimedOut);
    assert_eq!(start.elapsed(), Duration::from_secs(15));
    feeder.abort();
}

#[tokio::test(start_paused = true)]
async fn test_scenario_connection_loss_escalates() {
    let mut session = create_session();
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        time::sleep(Duration::from_secs(3)).await;
        let _ = tx.send(StreamEvent::ConnectionLost).await;
    });

    let outcome = session.sequencer.run(rx).await;

    assert_eq!(outcome, SessionOutcome::Disconnected);
    assert_eq!(session.phase(), SessionPhase::Failed);
    assert_eq!(session.calls.load(Ordering::SeqCst), 0);
    assert!(*session.teardown_rx.borrow());
}

#[tokio::test(start_paused = true)]
async fn test_scenario_steady_readings_never_time_out() {
    // Readings flowing once per second keep resetting the deadline, so a
    // session lasting longer than one budget still completes.
    let config = Config::default().with_stage_timeout_secs(5);
    let mut session = create_session_with(config, false, true);
    let (tx, rx) = mpsc::channel(64);
    let feeder = feed(
        tx,
        vec![(StageId::Temperature, "36.6", 7), (StageId::Alcohol, "0.00", 7)],
        0,
    );

    let outcome = session.sequencer.run(rx).await;

    assert_eq!(outcome, SessionOutcome::Completed);
    feeder.abort();
}
