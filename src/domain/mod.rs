//! Domain models - core types for the acquisition session
//!
//! This module contains the canonical data types used throughout the system:
//! - `StageId` - ordered measurement stages and their wire event names
//! - `Reading` - a single accepted sensor reading
//! - `StreamEvent` - events delivered by the sensor stream client
//! - `SessionOutcome` - terminal outcomes with fixed operator messages
//! - `SessionResult` - per-stage finalized values, payload and snapshot shapes

pub mod result;
pub mod types;

// Re-export commonly used types at module level
pub use result::{ResultSnapshot, SessionResult, SubmissionPayload};
pub use types::{Reading, SessionOutcome, StageId, StreamEvent, STAGE_SEQUENCE};
