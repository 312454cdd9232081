//! Price sources
//!
//! The external fetch is the only collaborator boundary of a check cycle.
//! Everything that produces a [`PriceObservation`] implements [`PriceSource`].

mod etherscan;

pub use etherscan::{parse_gas_oracle, EtherscanSource};

use crate::error::RetrievalError;
use crate::models::PriceObservation;

/// Capability to fetch the current price from somewhere
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    /// Identifier recorded on every observation
    fn name(&self) -> &str;

    /// Fetch the latest value
    async fn fetch(&self) -> Result<PriceObservation, RetrievalError>;
}
