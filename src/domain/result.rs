//! Session result model - per-stage finalized values and submission shapes

use crate::domain::types::{StageId, STAGE_SEQUENCE};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Generate a new UUIDv7 session id (time-sortable, for log correlation)
pub fn new_session_id() -> String {
    Uuid::now_v7().to_string()
}

/// Get current epoch milliseconds
#[inline]
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Accumulates one finalized value per stage.
///
/// Last write wins within a stage; the struct is no longer mutated once
/// submission begins (the sequencer tears the stream down first).
#[derive(Debug, Clone, Default)]
pub struct SessionResult {
    temperature: Option<String>,
    alcohol_level: Option<String>,
}

impl SessionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest value for a stage (last-write-wins, no averaging)
    pub fn record(&mut self, stage: StageId, value: &str) {
        match stage {
            StageId::Temperature => self.temperature = Some(value.to_string()),
            StageId::Alcohol => self.alcohol_level = Some(value.to_string()),
        }
    }

    pub fn value(&self, stage: StageId) -> Option<&str> {
        match stage {
            StageId::Temperature => self.temperature.as_deref(),
            StageId::Alcohol => self.alcohol_level.as_deref(),
        }
    }

    /// True when every stage in the sequence has a finalized value
    pub fn is_complete(&self) -> bool {
        STAGE_SEQUENCE.iter().all(|stage| self.value(*stage).is_some())
    }

    /// Build the submission payload, or None while any stage value is missing
    pub fn finalize(&self, face_id: &str) -> Option<SubmissionPayload> {
        Some(SubmissionPayload {
            temperature_data: TemperatureData { temperature: self.temperature.clone()? },
            alcohol_data: AlcoholData { alcohol_level: self.alcohol_level.clone()? },
            face_id: face_id.to_string(),
        })
    }

    /// Snapshot handed to the completion view after a successful submission
    pub fn snapshot(&self) -> Option<ResultSnapshot> {
        Some(ResultSnapshot {
            temperature: self.temperature.clone()?,
            alcohol: self.alcohol_level.clone()?,
        })
    }
}

/// Request body for the results endpoint. Field names follow the service
/// contract, not Rust conventions.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionPayload {
    #[serde(rename = "temperatureData")]
    pub temperature_data: TemperatureData,
    #[serde(rename = "alcoholData")]
    pub alcohol_data: AlcoholData,
    #[serde(rename = "faceId")]
    pub face_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemperatureData {
    pub temperature: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlcoholData {
    #[serde(rename = "alcoholLevel")]
    pub alcohol_level: String,
}

/// Persisted record for the completion view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSnapshot {
    pub temperature: String,
    pub alcohol: String,
}
