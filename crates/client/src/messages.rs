//! Training-progress event payloads and parser.
//!
//! The backend pushes JSON objects shaped like
//! `{"status": "<tag>", "percentage": 40, "message": "..."}` on the
//! training stream. `complete` and `error` are terminal; every other
//! status tag is an in-progress update.

use serde::{Deserialize, Deserializer};

/// Status tag that ends the stream successfully.
pub const STATUS_COMPLETE: &str = "complete";

/// Status tag that ends the stream with a failure.
pub const STATUS_ERROR: &str = "error";

/// Failure text used when an `error` event carries none.
pub const DEFAULT_TRAINING_ERROR: &str = "Training failed";

/// Classification of a progress event's status tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    InProgress,
    Complete,
    Error,
}

/// One update from the training stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainingProgress {
    /// Raw status tag as sent by the backend (e.g. `"training"`).
    pub status: String,
    /// Completion percentage, 0-100.
    #[serde(default, deserialize_with = "deserialize_percentage")]
    pub percentage: Option<u8>,
    #[serde(default)]
    pub message: Option<String>,
    /// Failure text on `error` events.
    #[serde(default)]
    pub error: Option<String>,
}

impl TrainingProgress {
    pub fn kind(&self) -> ProgressStatus {
        match self.status.as_str() {
            STATUS_COMPLETE => ProgressStatus::Complete,
            STATUS_ERROR => ProgressStatus::Error,
            _ => ProgressStatus::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind() != ProgressStatus::InProgress
    }

    /// Server-provided failure text, or [`DEFAULT_TRAINING_ERROR`].
    pub fn error_message(&self) -> &str {
        self.error
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_TRAINING_ERROR)
    }
}

/// Accept integer or fractional percentages, rounding and clamping to 0-100.
fn deserialize_percentage<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(0.0, 100.0) as u8))
}

/// Parse one event payload.
///
/// Returns `Err` for malformed JSON or a missing `status`. Callers should
/// log and skip such payloads.
pub fn parse_progress(data: &str) -> Result<TrainingProgress, serde_json::Error> {
    serde_json::from_str(data)
}
