use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use botica_core::ItemId;

/// Best catalog match for a product name.
///
/// This is an insight, not a decision: the restock reconciler compares
/// `confidence` against its own threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub item_id: Option<ItemId>,
    /// Confidence in \[0, 1\].
    pub confidence: f64,
    pub matched_name: Option<String>,
    /// Free-form metadata (model name, scores per candidate, timings).
    #[serde(default)]
    pub metadata: JsonValue,
}

impl MatchCandidate {
    pub fn none() -> Self {
        Self {
            item_id: None,
            confidence: 0.0,
            matched_name: None,
            metadata: JsonValue::Null,
        }
    }

    pub fn found(item_id: ItemId, name: impl Into<String>, confidence: f64) -> Self {
        Self {
            item_id: Some(item_id),
            confidence,
            matched_name: Some(name.into()),
            metadata: JsonValue::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("matcher unavailable: {0}")]
    Unavailable(String),
}
