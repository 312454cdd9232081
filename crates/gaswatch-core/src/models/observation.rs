//! Price observation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recorded price sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// The run that produced this observation
    pub run_id: Uuid,

    /// When the value was observed
    pub timestamp: DateTime<Utc>,

    /// Headline value (proposed gas price, gwei)
    pub value: f64,

    /// Identifier of the source that produced the value
    pub source: String,

    /// Full oracle reading, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<GasQuote>,
}

impl PriceObservation {
    /// Create an observation stamped with the current time and a fresh run id
    pub fn new(value: f64, source: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            timestamp: Utc::now(),
            value,
            source: source.into(),
            quote: None,
        }
    }

    /// Attach the full oracle reading
    #[must_use]
    pub fn with_quote(mut self, quote: GasQuote) -> Self {
        self.quote = Some(quote);
        self
    }
}

/// Gas oracle reading, all prices in gwei
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasQuote {
    /// Slow inclusion
    pub safe: f64,
    /// Standard inclusion; the headline value
    pub propose: f64,
    /// Fast inclusion
    pub fast: f64,
    /// Suggested base fee of the next block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggest_base_fee: Option<f64>,
    /// Block the reading was taken at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_block: Option<u64>,
}
