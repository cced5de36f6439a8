//! Portfolio construction from index effective weights.
//!
//! A thin consumer of the index calculator: effective weights and a target
//! notional in, instrument quantities and risk-limit findings out.

pub mod construction;
pub mod valuation;

pub use construction::*;
pub use valuation::*;
