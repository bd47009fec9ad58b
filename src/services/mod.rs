//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `sequencer` - The sequential acquisition state machine
//! - `stability` - Decaying confidence score gating stage completion
//! - `timeout` - Per-stage deadline supervision with latched escalation
//! - `submission` - At-most-once latch for the results request
//! - `lockout` - Consecutive-failure lockout for face verification

pub mod lockout;
pub mod sequencer;
pub mod stability;
pub mod submission;
pub mod timeout;

// Re-export commonly used types
pub use lockout::AttemptLockout;
pub use sequencer::{SessionPhase, StageSequencer};
pub use stability::StabilityAccumulator;
pub use submission::{SubmissionGuard, SubmissionState};
pub use timeout::TimeoutSupervisor;
