//! Kiosk PoC - sequential measurement acquisition for the access kiosk
//!
//! Runs acquisition sessions back to back: consume the sensor stream, walk
//! the stage sequence, and submit the aggregated results. Consecutive failed
//! sessions trip a lockout before the next one may start.
//!
//! Module structure:
//! - `domain/` - Core business types (stages, readings, session results)
//! - `io/` - External interfaces (sensor stream, submit endpoint, session store)
//! - `services/` - Business logic (sequencer, stability, timeout, guards)
//! - `infra/` - Infrastructure (Config)

use clap::Parser;
use kiosk_poc::domain::SessionOutcome;
use kiosk_poc::infra::Config;
use kiosk_poc::io::{ResultSubmitter, SensorStreamClient, SessionStore};
use kiosk_poc::services::{AttemptLockout, StageSequencer};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Kiosk PoC - sequential measurement acquisition session
#[derive(Parser, Debug)]
#[command(name = "kiosk-poc", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "kiosk-poc starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        sensor_addr = %config.sensor_addr(),
        submit_url = %config.submit_url(),
        max_stability = %config.max_stability(),
        stage_timeout_secs = %config.stage_timeout_secs(),
        token_file = %config.token_file(),
        "config_loaded"
    );

    // Handle shutdown on Ctrl+C
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let mut lockout =
        AttemptLockout::new(config.lockout_max_attempts(), config.lockout_cooldown());

    while !*shutdown_rx.borrow() {
        if lockout.is_locked(Instant::now()) {
            tokio::time::sleep(Duration::from_secs(1)).await;
            continue;
        }

        // Per-session wiring: the sequencer fires the teardown signal on
        // every terminal path, which stops this session's stream client.
        let (teardown_tx, teardown_rx) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::channel(64);

        let stream_client = SensorStreamClient::new(&config);
        tokio::spawn(async move {
            stream_client.run(event_tx, teardown_rx).await;
        });

        let submitter = ResultSubmitter::new(&config);
        let store = SessionStore::new(config.token_file(), config.snapshot_file());
        let mut sequencer = StageSequencer::new(&config, submitter, store, teardown_tx);

        let outcome = tokio::select! {
            outcome = sequencer.run(event_rx) => outcome,
            _ = shutdown_rx.changed() => {
                sequencer.teardown();
                break;
            }
        };
        info!(outcome = %outcome.as_str(), message = %outcome.message(), "session_finished");

        match outcome {
            SessionOutcome::Completed => {
                lockout.reset();
                break;
            }
            SessionOutcome::IdentityMissing => {
                // Cannot be fixed by another acquisition run; the kiosk has
                // to restart from the identification step.
                error!("identity_precondition_failed");
                break;
            }
            _ => {
                lockout.record_failure(Instant::now());
            }
        }
    }

    info!("kiosk-poc shutdown complete");
    Ok(())
}
