use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Commodity symbol (e.g. "CL", "NG", "GC"). Opaque to the engine.
pub type CommodityId = String;

/// Futures-like settlement prices. Wraps Decimal to prevent accidental f64 usage.
pub type Price = Decimal;

/// Monetary amounts (notionals, portfolio values).
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Index levels.
pub type Level = Decimal;

/// Commodity → weight. Ordered so that every summation over a map is deterministic.
pub type WeightMap = BTreeMap<CommodityId, Decimal>;

/// Absolute tolerance for "sums to one" checks on weight maps.
pub const WEIGHT_TOLERANCE: Decimal = dec!(0.000000001);

/// Currency code
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    GBP,
    #[default]
    USD,
    EUR,
    CHF,
    JPY,
    CAD,
    AUD,
    Other(String),
}

/// Index return variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexVariant {
    /// Price movement only.
    Excess,
    /// Excess return plus collateral interest.
    Total,
    /// Total return plus a configurable enhancement term.
    Enhanced,
}

impl IndexVariant {
    pub const ALL: [IndexVariant; 3] = [
        IndexVariant::Excess,
        IndexVariant::Total,
        IndexVariant::Enhanced,
    ];

    /// Whether the variant accrues collateral interest.
    pub fn needs_collateral(self) -> bool {
        !matches!(self, IndexVariant::Excess)
    }
}

impl fmt::Display for IndexVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndexVariant::Excess => "excess",
            IndexVariant::Total => "total",
            IndexVariant::Enhanced => "enhanced",
        };
        f.write_str(s)
    }
}

impl FromStr for IndexVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "excess" | "er" => Ok(IndexVariant::Excess),
            "total" | "tr" => Ok(IndexVariant::Total),
            "enhanced" => Ok(IndexVariant::Enhanced),
            other => Err(format!("unknown index variant '{other}' (expected excess, total or enhanced)")),
        }
    }
}

/// S&P GSCI commodity sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Energy,
    IndustrialMetals,
    PreciousMetals,
    Agriculture,
    Livestock,
}

/// Sum of all weights in a map.
pub fn weight_sum(weights: &WeightMap) -> Decimal {
    weights.values().copied().sum()
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
