//! Persistence under the mounted data directory
//!
//! Two files: the alert state flag, rewritten atomically, and an append-only
//! JSON Lines log of observations.

mod observations;
mod state;

pub use observations::ObservationLog;
pub use state::StateStore;
