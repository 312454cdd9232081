//! Data models for gaswatch

mod alert;
mod observation;

pub use alert::*;
pub use observation::*;
