pub mod config;
pub mod error;
pub mod types;

#[cfg(feature = "index")]
pub mod index;

#[cfg(feature = "portfolio")]
pub mod portfolio;

pub use config::{CommoditySpec, IndexConfig};
pub use error::GsciError;
pub use types::*;

/// Standard result type for all gsci-core operations
pub type GsciResult<T> = Result<T, GsciError>;
