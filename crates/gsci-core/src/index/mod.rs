//! Commodity index engine.
//!
//! Leaves first: [`weighting`] normalizes CPW mappings, [`disruption`] splits
//! the universe into frozen and free commodities, [`rebalancing`] derives the
//! day's effective weights, [`returns`] composes returns and compounds levels.
//! [`calculator`] drives them across a date sequence.

pub mod calculator;
pub mod disruption;
pub mod market_data;
pub mod rebalancing;
pub mod returns;
pub mod sources;
pub mod weighting;

pub use calculator::{
    calculate_index, calculate_index_step, DailyBreakdown, IndexCalculationInput,
    IndexCalculator, IndexRun, IndexState, IndexStepInput, IndexStepOutput, LevelPoint,
    RunPhase, WeightSnapshot,
};
pub use disruption::{classify, DisruptionKind, DisruptionPartition, MarketDisruptionEvent};
pub use market_data::MarketDataSet;
pub use rebalancing::{rebalance, RebalanceOutcome};
pub use returns::{daily_return, CommodityContribution, DailyReturns, PriceMap};
pub use sources::*;
pub use weighting::{normalize, normalize_universe};
