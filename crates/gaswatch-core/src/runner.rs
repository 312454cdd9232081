//! One check-and-record cycle

use tracing::{error, info, warn};

use crate::alerting::{notifier_from_config, Notifier, ThresholdEvaluator};
use crate::config::Config;
use crate::error::Result;
use crate::models::{CheckOutcome, CheckReport};
use crate::source::{EtherscanSource, PriceSource};
use crate::store::{ObservationLog, StateStore};

/// Executes exactly one fetch / record / evaluate / notify cycle per [`run`](Self::run)
pub struct PriceCheckRunner {
    source: Box<dyn PriceSource>,
    notifier: Box<dyn Notifier>,
    evaluator: ThresholdEvaluator,
    state: StateStore,
    log: ObservationLog,
    notify_on_failure: bool,
}

impl PriceCheckRunner {
    /// Assemble a runner from its collaborators
    pub fn new(
        source: Box<dyn PriceSource>,
        notifier: Box<dyn Notifier>,
        evaluator: ThresholdEvaluator,
        state: StateStore,
        log: ObservationLog,
    ) -> Self {
        Self {
            source,
            notifier,
            evaluator,
            state,
            log,
            notify_on_failure: true,
        }
    }

    /// Build the production runner: Etherscan source, Telegram (or log) notifier
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = EtherscanSource::new(&config.source)?;
        let notifier = notifier_from_config(&config.telegram, config.source.timeout())?;

        Ok(Self::new(
            Box::new(source),
            notifier,
            ThresholdEvaluator::from_config(&config.alerting),
            StateStore::new(config.storage.state_path()),
            ObservationLog::new(config.storage.observations_path()),
        )
        .notify_on_failure(config.alerting.notify_on_failure))
    }

    /// Whether a failed fetch sends a notification before the run fails
    #[must_use]
    pub fn notify_on_failure(mut self, enabled: bool) -> Self {
        self.notify_on_failure = enabled;
        self
    }

    /// The state store this runner writes to
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// The observation log this runner appends to
    pub fn log(&self) -> &ObservationLog {
        &self.log
    }

    /// Run one cycle
    ///
    /// A retrieval failure returns [`Error::Retrieval`](crate::Error::Retrieval)
    /// and leaves the data directory untouched. The alert state is written
    /// before the observation is appended; if the append fails the prior state
    /// is put back, so a failed run records neither.
    pub async fn run(&self) -> Result<CheckReport> {
        info!(
            source = self.source.name(),
            threshold = self.evaluator.threshold(),
            "Checking gas price"
        );

        let prior = self.state.load().await?;
        let was_notified = prior.is_some_and(|s| s.notified);

        let observation = match self.source.fetch().await {
            Ok(observation) => observation,
            Err(e) => {
                error!(source = self.source.name(), error = %e, "Price retrieval failed");
                if self.notify_on_failure {
                    self.notifier
                        .send(&ThresholdEvaluator::failure_message(&e))
                        .await;
                }
                return Err(e.into());
            }
        };

        let outcome = self.evaluator.evaluate(observation.value, was_notified);
        let mut next_state = None;
        let mut notification = None;

        match outcome {
            CheckOutcome::Triggered => {
                let message = self.evaluator.alert_message(&observation);
                let result = self.notifier.send(&message).await;

                if result.success {
                    next_state = Some(true);
                } else {
                    warn!(
                        value = observation.value,
                        "Alert not delivered, will retry on the next check"
                    );
                }
                notification = Some(result.into());
            }
            CheckOutcome::Reset => {
                next_state = Some(false);
                info!(value = observation.value, "Price crossed back, resetting alert state");
            }
            CheckOutcome::NoAction => {
                info!(value = observation.value, "No action taken");
            }
        }

        if prior.is_none() && next_state.is_none() {
            next_state = Some(false);
            info!(path = %self.state.path().display(), "State file not found, creating it");
        }

        if let Some(notified) = next_state {
            self.state.save(notified).await?;
        }

        if let Err(e) = self.log.append(&observation).await {
            error!(run_id = %observation.run_id, error = %e, "Observation not recorded");
            if next_state.is_some() {
                if let Err(restore) = self.state.restore(prior).await {
                    error!(
                        path = %self.state.path().display(),
                        error = %restore,
                        "Could not put back the alert state"
                    );
                }
            }
            return Err(e);
        }

        Ok(CheckReport {
            observation,
            threshold: self.evaluator.threshold(),
            outcome,
            notified: next_state.unwrap_or(was_notified),
            notification,
        })
    }
}
