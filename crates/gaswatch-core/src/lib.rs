//! # gaswatch
//!
//! Ethereum gas price checker with threshold alerts.
//!
//! Each check cycle fetches the proposed gas price from the Etherscan gas
//! oracle, appends it to an observation log in the data directory, and sends
//! a Telegram message the first time the price drops below the configured
//! threshold. The alert re-arms once the price rises back.
//!
//! ## Architecture
//!
//! - **Source**: the external fetch, behind the [`source::PriceSource`] trait
//! - **Store**: alert state flag and JSON Lines observation log under `/data`
//! - **Alerting**: edge-triggered threshold evaluation and notifiers
//! - **Runner**: one check-and-record cycle; **Watcher** repeats it
//!
//! ## Quick Start
//!
//! ```bash
//! # One check, exit code reflects the outcome
//! gaswatch check
//!
//! # Check every CHECK_INTERVAL seconds
//! gaswatch watch
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerting;
pub mod config;
pub mod error;
pub mod models;
pub mod runner;
pub mod source;
pub mod store;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
pub use runner::PriceCheckRunner;
pub use watcher::Watcher;

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{Notifier, ThresholdEvaluator};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result, RetrievalError};
    pub use crate::models::*;
    pub use crate::runner::PriceCheckRunner;
    pub use crate::source::PriceSource;
    pub use crate::store::{ObservationLog, StateStore};
    pub use crate::watcher::{WatchStats, Watcher};
}
