//! Threshold evaluation

use crate::config::AlertingConfig;
use crate::error::RetrievalError;
use crate::models::{CheckOutcome, Operator, PriceObservation};

/// Decides whether an observation fires, re-arms or leaves the alert alone
///
/// The alert is edge-triggered: it fires once when the condition becomes
/// true and is re-armed only after the condition clears.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdEvaluator {
    threshold: f64,
    operator: Operator,
}

impl ThresholdEvaluator {
    /// Create an evaluator for `value <operator> threshold`
    pub fn new(threshold: f64, operator: Operator) -> Self {
        Self { threshold, operator }
    }

    /// Create an evaluator from the alerting section
    pub fn from_config(config: &AlertingConfig) -> Self {
        Self::new(config.gas_fee_threshold, config.operator)
    }

    /// Configured threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compare a value with the threshold given the persisted state
    pub fn evaluate(&self, value: f64, notified: bool) -> CheckOutcome {
        match (self.operator.check(value, self.threshold), notified) {
            (true, false) => CheckOutcome::Triggered,
            (false, true) => CheckOutcome::Reset,
            _ => CheckOutcome::NoAction,
        }
    }

    /// Text of the alert sent when the condition is met
    pub fn alert_message(&self, observation: &PriceObservation) -> String {
        let mut message = format!(
            "ETH proposed gas price {} threshold {:.2} gwei: {:.2} gwei",
            self.operator.describe(),
            self.threshold,
            observation.value
        );

        if let Some(quote) = &observation.quote {
            message.push_str(&format!(
                " (safe {:.2}, fast {:.2})",
                quote.safe, quote.fast
            ));
        }

        message
    }

    /// Text sent when the price could not be retrieved
    pub fn failure_message(error: &RetrievalError) -> String {
        format!("Gas price check failed: {error}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GasQuote;
    use rstest::rstest;

    #[rstest]
    #[case::drops_below(99.0, false, CheckOutcome::Triggered)]
    #[case::still_below(50.0, true, CheckOutcome::NoAction)]
    #[case::recovers(100.0, true, CheckOutcome::Reset)]
    #[case::rises_above(150.0, true, CheckOutcome::Reset)]
    #[case::stays_above(150.0, false, CheckOutcome::NoAction)]
    #[case::at_threshold(100.0, false, CheckOutcome::NoAction)]
    fn test_below_threshold(
        #[case] value: f64,
        #[case] notified: bool,
        #[case] expected: CheckOutcome,
    ) {
        let evaluator = ThresholdEvaluator::new(100.0, Operator::Lt);
        assert_eq!(evaluator.evaluate(value, notified), expected);
    }

    #[test]
    fn test_above_threshold_operator() {
        let evaluator = ThresholdEvaluator::new(50.0, Operator::Gt);

        assert_eq!(evaluator.evaluate(80.0, false), CheckOutcome::Triggered);
        assert_eq!(evaluator.evaluate(40.0, true), CheckOutcome::Reset);
    }

    #[test]
    fn test_alert_message() {
        let evaluator = ThresholdEvaluator::new(20.0, Operator::Lt);
        let observation = PriceObservation::new(12.5, "test").with_quote(GasQuote {
            safe: 11.0,
            propose: 12.5,
            fast: 14.0,
            suggest_base_fee: None,
            last_block: None,
        });

        assert_eq!(
            evaluator.alert_message(&observation),
            "ETH proposed gas price is below threshold 20.00 gwei: 12.50 gwei (safe 11.00, fast 14.00)"
        );
    }

    #[test]
    fn test_failure_message() {
        let err = RetrievalError::malformed("invalid JSON");
        assert_eq!(
            ThresholdEvaluator::failure_message(&err),
            "Gas price check failed: malformed response: invalid JSON"
        );
    }
}
