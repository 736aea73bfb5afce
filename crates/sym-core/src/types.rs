use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SymError;

/// Default vector store namespace holding every feedback vector.
pub const DEFAULT_NAMESPACE: &str = "comentarios_namespace";

/// Metadata payload attached to a vector entry.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Keys used in vector entry metadata.
pub mod metadata_keys {
    pub const COMMENT: &str = "comentario";
    pub const SENTIMENT: &str = "sentimento";
    pub const TIMESTAMP: &str = "timestamp";
    pub const NAME: &str = "nome";
    pub const EMAIL: &str = "email";
    pub const UNIT: &str = "unidade";
}

// =============================================================================
// Enums
// =============================================================================

/// Closed sentiment label set. Nothing outside these four values is ever
/// persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    /// The classifier reply could not be mapped to a known label.
    Undefined,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Undefined => "undefined",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = SymError;

    /// Parses a stored label. Only the canonical lower-case English labels are
    /// accepted; classifier replies go through the classifier's normalizer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            "undefined" => Ok(Sentiment::Undefined),
            other => Err(SymError::Validation(format!(
                "unknown sentiment label: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// One customer-feedback entry as held by the relational store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Store-assigned id, also the vector entry id (as a string).
    pub id: i64,
    pub comment_text: String,
    pub sentiment: Option<Sentiment>,
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub unit: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Identifying details attached to a record after analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub unit: String,
}

impl CustomerDetails {
    /// Metadata patch applied to the matching vector entry.
    pub fn to_metadata(&self) -> Metadata {
        let mut patch = Metadata::new();
        patch.insert(metadata_keys::NAME.into(), self.name.clone().into());
        patch.insert(metadata_keys::EMAIL.into(), self.email.clone().into());
        patch.insert(metadata_keys::UNIT.into(), self.unit.clone().into());
        patch
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Number of comments per unit. `unit` is `None` for records never enriched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCount {
    pub unit: Option<String>,
    pub count: i64,
}

/// Number of comments per (unit, sentiment) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSentimentCount {
    pub unit: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub count: i64,
}

/// Number of comments per (calendar day, sentiment) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentTrendPoint {
    /// ISO-8601 calendar date (`YYYY-MM-DD`).
    pub date: String,
    pub sentiment: Option<Sentiment>,
    pub count: i64,
}
