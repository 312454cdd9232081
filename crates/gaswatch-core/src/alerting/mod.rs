//! Alerting for gaswatch
//!
//! Threshold evaluation with edge-triggered state, and notification delivery.

mod evaluator;
mod notifier;

pub use evaluator::ThresholdEvaluator;
pub use notifier::{
    notifier_from_config, LogNotifier, NotificationResult, Notifier, TelegramNotifier,
};
