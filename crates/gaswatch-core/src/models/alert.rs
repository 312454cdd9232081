//! Alert data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PriceObservation;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Greater than
    Gt,
    /// Less than
    #[default]
    Lt,
    /// Greater than or equal to
    Gte,
    /// Less than or equal to
    Lte,
}

impl Operator {
    /// Check if a value satisfies the comparison against a threshold
    pub fn check(self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Gt => value > threshold,
            Operator::Lt => value < threshold,
            Operator::Gte => value >= threshold,
            Operator::Lte => value <= threshold,
        }
    }

    /// Human-readable verb for messages
    pub fn describe(self) -> &'static str {
        match self {
            Operator::Gt => "is above",
            Operator::Lt => "is below",
            Operator::Gte => "reached or exceeded",
            Operator::Lte => "fell to or below",
        }
    }
}

/// Persisted alert state between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlertState {
    /// Whether an alert was delivered and has not been re-armed yet
    pub notified: bool,
    /// Last modification time of the state file, when known
    pub updated_at: Option<DateTime<Utc>>,
}

/// Result of comparing an observation with the threshold and prior state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Condition newly met; an alert should be sent
    Triggered,
    /// Condition cleared after an alert; state re-arms
    Reset,
    /// Nothing changes
    NoAction,
}

/// Record of a sent notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Channel type
    pub channel_type: String,

    /// When it was sent
    pub sent_at: DateTime<Utc>,

    /// Whether it succeeded
    pub success: bool,

    /// Error message if failed
    pub error: Option<String>,
}

/// Summary of one completed check cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    /// The observation that was recorded
    pub observation: PriceObservation,
    /// Threshold the observation was compared to
    pub threshold: f64,
    /// Decision taken
    pub outcome: CheckOutcome,
    /// Alert state after the cycle
    pub notified: bool,
    /// Notification attempt, when one was made
    pub notification: Option<NotificationRecord>,
}
