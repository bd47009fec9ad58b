//! Shared types for the kiosk acquisition gateway

use serde::Deserialize;
use tokio::time::Instant;

/// Ordered measurement stage sequence for a session.
///
/// No branching: the sequencer walks this list front to back. The set and
/// its order are fixed for the lifetime of a session.
pub const STAGE_SEQUENCE: [StageId; 2] = [StageId::Temperature, StageId::Alcohol];

/// One measurement stage, bound to one sensor-originated event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    Temperature,
    Alcohol,
}

impl StageId {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Temperature => "temperature",
            StageId::Alcohol => "alcohol",
        }
    }

    /// Resolve a wire event name to a stage
    pub fn from_event(name: &str) -> Option<StageId> {
        match name {
            "temperature" => Some(StageId::Temperature),
            "alcohol" => Some(StageId::Alcohol),
            _ => None,
        }
    }

    /// Display title for the kiosk screen
    pub fn title(&self) -> &'static str {
        match self {
            StageId::Temperature => "Temperature measurement",
            StageId::Alcohol => "Alcohol level measurement",
        }
    }

    /// Measurement unit for the kiosk screen
    pub fn unit(&self) -> &'static str {
        match self {
            StageId::Temperature => "\u{b0}C",
            StageId::Alcohol => "MG",
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single accepted sensor reading. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Reading {
    pub stage: StageId,
    pub value: String,
    pub received_at: Instant,
}

/// Wire message from the measurement service (one JSON object per line)
///
/// The service emits one event per stage per second, named by stage, with
/// the value carried in a stage-specific field:
/// `{"event":"temperature","temperature":"36.6"}`
/// `{"event":"alcohol","alcoholLevel":"0.00"}`
#[derive(Debug, Deserialize)]
pub struct SensorMessage {
    pub event: String,
    #[serde(default)]
    pub temperature: Option<String>,
    #[serde(default, rename = "alcoholLevel")]
    pub alcohol_level: Option<String>,
}

impl SensorMessage {
    /// Convert to a reading, or None for unknown events or missing values
    pub fn into_reading(self, received_at: Instant) -> Option<Reading> {
        let stage = StageId::from_event(&self.event)?;
        let value = match stage {
            StageId::Temperature => self.temperature,
            StageId::Alcohol => self.alcohol_level,
        }?;
        Some(Reading { stage, value, received_at })
    }
}

/// Event delivered from the sensor stream client to the sequencer
#[derive(Debug)]
pub enum StreamEvent {
    Reading(Reading),
    /// Transport-level failure: connect error or a dropped connection.
    /// Treated by the sequencer exactly like a timeout expiry.
    ConnectionLost,
}

/// Fixed operator message for signal loss (timeout and disconnect)
pub const TIMEOUT_MESSAGE: &str =
    "Unable to read sensor data. Please try again or contact the administration.";

/// Terminal outcome of an acquisition session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Results submitted and acknowledged; snapshot persisted
    Completed,
    /// No usable reading for the full stage budget
    TimedOut,
    /// Stream transport failed; escalated without waiting out the budget
    Disconnected,
    /// Results endpoint rejected the request; explicit retry permitted
    SubmitFailed,
    /// No identity token at submission time; no retry path
    IdentityMissing,
}

impl SessionOutcome {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::Completed => "completed",
            SessionOutcome::TimedOut => "timed_out",
            SessionOutcome::Disconnected => "disconnected",
            SessionOutcome::SubmitFailed => "submit_failed",
            SessionOutcome::IdentityMissing => "identity_missing",
        }
    }

    /// Pre-authored message shown by the display layer. Never raw error detail.
    pub fn message(&self) -> &'static str {
        match self {
            SessionOutcome::Completed => "All checks passed. The door is unlocked.",
            SessionOutcome::TimedOut | SessionOutcome::Disconnected => TIMEOUT_MESSAGE,
            SessionOutcome::SubmitFailed => {
                "Could not send the results. Please try again."
            }
            SessionOutcome::IdentityMissing => {
                "Identity could not be confirmed. Please restart from identification."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_from_event() {
        assert_eq!(StageId::from_event("temperature"), Some(StageId::Temperature));
        assert_eq!(StageId::from_event("alcohol"), Some(StageId::Alcohol));
        assert_eq!(StageId::from_event("heartbeat"), None);
    }

    #[test]
    fn test_stage_sequence_order() {
        assert_eq!(STAGE_SEQUENCE[0], StageId::Temperature);
        assert_eq!(STAGE_SEQUENCE[1], StageId::Alcohol);
    }

    #[test]
    fn test_stage_display_metadata() {
        assert_eq!(StageId::Temperature.title(), "Temperature measurement");
        assert_eq!(StageId::Temperature.unit(), "\u{b0}C");
        assert_eq!(StageId::Alcohol.title(), "Alcohol level measurement");
        assert_eq!(StageId::Alcohol.unit(), "MG");
    }

    #[test]
    fn test_message_into_reading() {
        let msg: SensorMessage =
            serde_json::from_str(r#"{"event":"temperature","temperature":"36.6"}"#).unwrap();
        let reading = msg.into_reading(Instant::now()).unwrap();
        assert_eq!(reading.stage, StageId::Temperature);
        assert_eq!(reading.value, "36.6");
    }

    #[test]
    fn test_message_alcohol_field() {
        let msg: SensorMessage =
            serde_json::from_str(r#"{"event":"alcohol","alcoholLevel":"0.00"}"#).unwrap();
        let reading = msg.into_reading(Instant::now()).unwrap();
        assert_eq!(reading.stage, StageId::Alcohol);
        assert_eq!(reading.value, "0.00");
    }

    #[test]
    fn test_message_missing_value_dropped() {
        let msg: SensorMessage = serde_json::from_str(r#"{"event":"temperature"}"#).unwrap();
        assert!(msg.into_reading(Instant::now()).is_none());
    }

    #[test]
    fn test_message_unknown_event_dropped() {
        let msg: SensorMessage =
            serde_json::from_str(r#"{"event":"heartbeat","temperature":"1"}"#).unwrap();
        assert!(msg.into_reading(Instant::now()).is_none());
    }

    #[test]
    fn test_escalation_messages_fixed() {
        assert_eq!(SessionOutcome::TimedOut.message(), TIMEOUT_MESSAGE);
        assert_eq!(SessionOutcome::Disconnected.message(), TIMEOUT_MESSAGE);
    }
}
