//! Run configuration: the commodity universe and calculation parameters.
//!
//! An [`IndexConfig`] is an immutable value handed to the calculator at
//! construction. Nothing in the engine reads ambient state, so independent
//! runs with different configurations can execute side by side.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::GsciError;
use crate::types::{CommodityId, Currency, IndexVariant, Rate, Sector, WeightMap, WEIGHT_TOLERANCE};
use crate::GsciResult;

// ---------------------------------------------------------------------------
// Commodity specification
// ---------------------------------------------------------------------------

/// Static description of one index commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommoditySpec {
    pub symbol: CommodityId,
    pub sector: Sector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    /// Units of the underlying per futures contract (e.g. 1000 barrels).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_size: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measure: Option<String>,
    #[serde(default)]
    pub currency: Currency,
}

impl CommoditySpec {
    pub fn new(symbol: impl Into<CommodityId>, sector: Sector) -> Self {
        Self {
            symbol: symbol.into(),
            sector,
            exchange: None,
            contract_size: None,
            unit_of_measure: None,
            currency: Currency::USD,
        }
    }

    fn listed(symbol: &str, sector: Sector, exchange: &str, size: Decimal, unit: &str) -> Self {
        Self {
            symbol: symbol.into(),
            sector,
            exchange: Some(exchange.into()),
            contract_size: Some(size),
            unit_of_measure: Some(unit.into()),
            currency: Currency::USD,
        }
    }

    /// The 24-commodity reference universe with listing exchange and contract size.
    pub fn standard_universe() -> Vec<CommoditySpec> {
        use Sector::*;
        vec![
            Self::listed("WTI", Energy, "NYMEX", dec!(1000), "barrels"),
            Self::listed("BRENT", Energy, "ICE", dec!(1000), "barrels"),
            Self::listed("RBOB", Energy, "NYMEX", dec!(42000), "gallons"),
            Self::listed("HEATING", Energy, "NYMEX", dec!(42000), "gallons"),
            Self::listed("NATURAL", Energy, "NYMEX", dec!(10000), "MMBtu"),
            Self::listed("COPPER", IndustrialMetals, "COMEX", dec!(25000), "pounds"),
            Self::listed("ALUMINUM", IndustrialMetals, "LME", dec!(25), "metric tons"),
            Self::listed("ZINC", IndustrialMetals, "LME", dec!(25), "metric tons"),
            Self::listed("NICKEL", IndustrialMetals, "LME", dec!(6), "metric tons"),
            Self::listed("LEAD", IndustrialMetals, "LME", dec!(25), "metric tons"),
            Self::listed("GOLD", PreciousMetals, "COMEX", dec!(100), "troy ounces"),
            Self::listed("SILVER", PreciousMetals, "COMEX", dec!(5000), "troy ounces"),
            Self::listed("CORN", Agriculture, "CBOT", dec!(5000), "bushels"),
            Self::listed("WHEAT", Agriculture, "CBOT", dec!(5000), "bushels"),
            Self::listed("SOYBEANS", Agriculture, "CBOT", dec!(5000), "bushels"),
            Self::listed("SOYBEAN_OIL", Agriculture, "CBOT", dec!(60000), "pounds"),
            Self::listed("SOYBEAN_MEAL", Agriculture, "CBOT", dec!(100), "short tons"),
            Self::listed("COTTON", Agriculture, "ICE", dec!(50000), "pounds"),
            Self::listed("COFFEE", Agriculture, "ICE", dec!(37500), "pounds"),
            Self::listed("SUGAR", Agriculture, "ICE", dec!(112000), "pounds"),
            Self::listed("COCOA", Agriculture, "ICE", dec!(10), "metric tons"),
            Self::listed("LIVE_CATTLE", Livestock, "CME", dec!(40000), "pounds"),
            Self::listed("LEAN_HOGS", Livestock, "CME", dec!(40000), "pounds"),
            Self::listed("FEEDER_CATTLE", Livestock, "CME", dec!(50000), "pounds"),
        ]
    }

    /// Reference production weights for [`standard_universe`](Self::standard_universe).
    pub fn standard_reference_weights() -> WeightMap {
        [
            ("WTI", dec!(0.243)),
            ("BRENT", dec!(0.150)),
            ("RBOB", dec!(0.078)),
            ("HEATING", dec!(0.054)),
            ("NATURAL", dec!(0.086)),
            ("COPPER", dec!(0.063)),
            ("ALUMINUM", dec!(0.031)),
            ("ZINC", dec!(0.018)),
            ("NICKEL", dec!(0.016)),
            ("LEAD", dec!(0.008)),
            ("GOLD", dec!(0.031)),
            ("SILVER", dec!(0.008)),
            ("CORN", dec!(0.063)),
            ("WHEAT", dec!(0.031)),
            ("SOYBEANS", dec!(0.031)),
            ("SOYBEAN_OIL", dec!(0.016)),
            ("SOYBEAN_MEAL", dec!(0.016)),
            ("COTTON", dec!(0.016)),
            ("COFFEE", dec!(0.016)),
            ("SUGAR", dec!(0.016)),
            ("COCOA", dec!(0.008)),
            ("LIVE_CATTLE", dec!(0.031)),
            ("LEAN_HOGS", dec!(0.016)),
            ("FEEDER_CATTLE", dec!(0.008)),
        ]
        .into_iter()
        .map(|(c, w)| (c.to_string(), w))
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Index configuration
// ---------------------------------------------------------------------------

fn default_initial_level() -> Decimal {
    dec!(100)
}

fn default_variants() -> Vec<IndexVariant> {
    vec![IndexVariant::Excess]
}

fn default_tolerance() -> Decimal {
    WEIGHT_TOLERANCE
}

fn default_price_move_warning() -> Option<Rate> {
    Some(dec!(0.50))
}

/// Immutable configuration for one calculation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "IndexConfig::default_name")]
    pub name: String,
    pub universe: Vec<CommoditySpec>,
    #[serde(default = "default_initial_level")]
    pub initial_level: Decimal,
    #[serde(default = "default_variants")]
    pub variants: Vec<IndexVariant>,
    /// Tolerance for weight-sum checks.
    #[serde(default = "default_tolerance")]
    pub weight_tolerance: Decimal,
    /// Annualized spread added to the Enhanced variant (ACT/365 on calendar days).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancement_spread: Option<Rate>,
    /// Absolute daily price move above which a data-quality warning is recorded.
    #[serde(default = "default_price_move_warning")]
    pub price_move_warning: Option<Rate>,
}

impl IndexConfig {
    fn default_name() -> String {
        "S&P GSCI".into()
    }

    /// Configuration over a bare list of symbols, every commodity tagged `Energy`
    /// unless a richer [`CommoditySpec`] is supplied.
    pub fn for_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CommodityId>,
    {
        Self::new(
            symbols
                .into_iter()
                .map(|s| CommoditySpec::new(s, Sector::Energy))
                .collect(),
        )
    }

    pub fn new(universe: Vec<CommoditySpec>) -> Self {
        Self {
            name: Self::default_name(),
            universe,
            initial_level: default_initial_level(),
            variants: default_variants(),
            weight_tolerance: default_tolerance(),
            enhancement_spread: None,
            price_move_warning: default_price_move_warning(),
        }
    }

    pub fn standard() -> Self {
        Self::new(CommoditySpec::standard_universe())
    }

    /// Universe symbols in configuration order.
    pub fn symbols(&self) -> Vec<CommodityId> {
        self.universe.iter().map(|c| c.symbol.clone()).collect()
    }

    pub fn spec(&self, symbol: &str) -> Option<&CommoditySpec> {
        self.universe.iter().find(|c| c.symbol == symbol)
    }

    pub fn validate(&self) -> GsciResult<()> {
        if self.universe.is_empty() {
            return Err(GsciError::InsufficientData(
                "At least one commodity is required in the universe".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        for c in &self.universe {
            if c.symbol.trim().is_empty() {
                return Err(GsciError::InvalidInput {
                    field: "universe".into(),
                    reason: "Commodity symbol must not be empty".into(),
                });
            }
            if !seen.insert(c.symbol.as_str()) {
                return Err(GsciError::InvalidInput {
                    field: "universe".into(),
                    reason: format!("Duplicate commodity {}", c.symbol),
                });
            }
            if let Some(size) = c.contract_size {
                if size <= Decimal::ZERO {
                    return Err(GsciError::InvalidInput {
                        field: "contract_size".into(),
                        reason: format!("Contract size must be positive for {}", c.symbol),
                    });
                }
            }
        }
        if self.initial_level <= Decimal::ZERO {
            return Err(GsciError::InvalidInput {
                field: "initial_level".into(),
                reason: "Initial level must be positive".into(),
            });
        }
        if self.weight_tolerance < Decimal::ZERO {
            return Err(GsciError::InvalidInput {
                field: "weight_tolerance".into(),
                reason: "Tolerance must be non-negative".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
