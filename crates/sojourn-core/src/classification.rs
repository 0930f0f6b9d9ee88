//! Language-model classification records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stay::{Purpose, StayId};

/// Placeholder stored when a field could not be extracted from a reply.
pub const NONE_SENTINEL: &str = "None";

/// Outcome of classifying one stay point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationStatus {
    /// Both place and type were extracted from the reply.
    Parsed,
    /// The model answered, but at least one field fell back to the sentinel.
    Unparseable,
    /// The map query failed or timed out; the model was not called.
    PoiQueryFailed,
    /// The model call failed or timed out.
    ModelFailed,
}

impl ClassificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Unparseable => "unparseable",
            Self::PoiQueryFailed => "poi_query_failed",
            Self::ModelFailed => "model_failed",
        }
    }

    /// The model produced a reply. Failed remote calls are retried on resume.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Parsed | Self::Unparseable)
    }
}

/// Result of asking the language model about one stay point.
///
/// The exact prompt is retained for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmClassification {
    pub stay_id: StayId,
    pub place: String,
    pub activity_type: String,
    pub response: String,
    pub prompt: String,
    pub status: ClassificationStatus,
    pub model: String,
    pub poi_count: usize,
    pub classified_at: DateTime<Utc>,
}

impl LlmClassification {
    /// Activity purpose, or `None` when the type is the sentinel.
    pub fn purpose(&self) -> Option<Purpose> {
        Purpose::activity(&self.activity_type)
    }
}
