//! Daily return composition and level compounding.
//!
//! Covers:
//! 1. **Price relatives** -- curr * (1 + roll_adjustment) / prev, strictly positive
//! 2. **Excess return** -- sum(prior_weight_i * (relative_i - 1)) over weighted commodities
//! 3. **Total return** -- excess + daily collateral rate
//! 4. **Enhanced return** -- total + enhancement adjustment
//! 5. **Compounding** -- level_t = level_{t-1} * (1 + r_t)
//!
//! Weights are the effective weights fixed at the previous close. Missing market
//! data for a weighted commodity is an error, never a zero return.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::GsciError;
use crate::types::{CommodityId, IndexVariant, Level, Price, Rate, WeightMap};
use crate::GsciResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Commodity → price on one date.
pub type PriceMap = BTreeMap<CommodityId, Price>;

/// One commodity's share of a day's excess return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityContribution {
    pub commodity: CommodityId,
    pub weight: Decimal,
    pub previous_price: Price,
    pub current_price: Price,
    pub roll_adjustment: Rate,
    pub price_relative: Decimal,
    /// weight * (price_relative - 1)
    pub contribution: Rate,
}

/// Excess return for a date with its per-commodity attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcessReturn {
    pub excess_return: Rate,
    pub contributions: Vec<CommodityContribution>,
}

/// Every variant's return for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReturns {
    pub excess: Rate,
    pub collateral: Rate,
    pub enhancement: Rate,
    pub total: Rate,
    pub enhanced: Rate,
}

impl DailyReturns {
    pub fn for_variant(&self, variant: IndexVariant) -> Rate {
        match variant {
            IndexVariant::Excess => self.excess,
            IndexVariant::Total => self.total,
            IndexVariant::Enhanced => self.enhanced,
        }
    }
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Single-day price relative for `commodity` from `previous_date` to `date`.
pub fn price_relative(
    commodity: &str,
    date: NaiveDate,
    previous_date: NaiveDate,
    previous_price: Option<Price>,
    current_price: Option<Price>,
    roll_adjustment: Rate,
) -> GsciResult<Decimal> {
    let prev = previous_price
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| missing_price(commodity, previous_date))?;
    let curr = current_price
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| missing_price(commodity, date))?;

    let relative = curr
        .checked_mul(Decimal::ONE + roll_adjustment)
        .and_then(|adjusted| adjusted.checked_div(prev))
        .ok_or_else(|| GsciError::InvalidInput {
            field: "price".into(),
            reason: format!(
                "Price relative for {commodity} on {date} ({curr} over {prev}) is out of range"
            ),
        })?;
    if relative <= Decimal::ZERO {
        return Err(GsciError::InvalidInput {
            field: "roll_adjustment".into(),
            reason: format!(
                "Roll adjustment {roll_adjustment} for {commodity} on {date} gives a non-positive price relative"
            ),
        });
    }
    Ok(relative)
}

/// Weighted excess return for `date` using weights fixed at `previous_date`.
///
/// Commodities with zero prior weight are skipped and need no prices.
pub fn daily_return(
    date: NaiveDate,
    previous_date: NaiveDate,
    prior_weights: &WeightMap,
    previous_prices: &PriceMap,
    current_prices: &PriceMap,
    roll_adjustments: &BTreeMap<CommodityId, Rate>,
) -> GsciResult<ExcessReturn> {
    let mut excess_return = Decimal::ZERO;
    let mut contributions = Vec::new();

    for (c, &w) in prior_weights {
        if w.is_zero() {
            continue;
        }
        let roll = roll_adjustments.get(c).copied().unwrap_or(Decimal::ZERO);
        let previous_price = previous_prices.get(c).copied();
        let current_price = current_prices.get(c).copied();
        let relative = price_relative(c, date, previous_date, previous_price, current_price, roll)?;
        let contribution = w
            .checked_mul(relative - Decimal::ONE)
            .ok_or_else(|| out_of_range("contribution", c, date))?;
        excess_return = excess_return
            .checked_add(contribution)
            .ok_or_else(|| out_of_range("excess_return", c, date))?;
        contributions.push(CommodityContribution {
            commodity: c.clone(),
            weight: w,
            previous_price: previous_price.unwrap_or_default(),
            current_price: current_price.unwrap_or_default(),
            roll_adjustment: roll,
            price_relative: relative,
            contribution,
        });
    }

    Ok(ExcessReturn {
        excess_return,
        contributions,
    })
}

/// Layer collateral and enhancement on top of the excess return.
pub fn compose(excess: Rate, collateral: Rate, enhancement: Rate) -> DailyReturns {
    let total = excess + collateral;
    DailyReturns {
        excess,
        collateral,
        enhancement,
        total,
        enhanced: total + enhancement,
    }
}

/// Compound one day: `prior_level * (1 + day_return)`.
pub fn next_level(prior_level: Level, day_return: Rate) -> GsciResult<Level> {
    let growth = Decimal::ONE + day_return;
    if growth <= Decimal::ZERO {
        return Err(GsciError::InvalidInput {
            field: "day_return".into(),
            reason: format!("Return {day_return} would drive the index level to or below zero"),
        });
    }
    prior_level
        .checked_mul(growth)
        .ok_or_else(|| GsciError::InvalidInput {
            field: "level".into(),
            reason: format!("Level {prior_level} compounded by {growth} is out of range"),
        })
}

/// Zero and negative quotes are treated as absent.
fn missing_price(commodity: &str, date: NaiveDate) -> GsciError {
    GsciError::MissingPrice {
        commodity: commodity.to_string(),
        date,
    }
}

fn out_of_range(field: &str, commodity: &str, date: NaiveDate) -> GsciError {
    GsciError::InvalidInput {
        field: field.into(),
        reason: format!("{commodity} on {date} overflows the decimal range"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn map(entries: &[(&str, Decimal)]) -> BTreeMap<CommodityId, Decimal> {
        entries.iter().map(|(c, v)| (c.to_string(), *v)).collect()
    }

    fn weights() -> WeightMap {
        map(&[("CL", dec!(0.5)), ("NG", dec!(0.3)), ("GC", dec!(0.2))])
    }

    fn flat_prices() -> PriceMap {
        map(&[("CL", dec!(80)), ("NG", dec!(3)), ("GC", dec!(1900))])
    }

    #[test]
    fn test_flat_prices_zero_return() {
        let out = daily_return(d(3), d(2), &weights(), &flat_prices(), &flat_prices(), &BTreeMap::new())
            .unwrap();
        assert_eq!(out.excess_return, Decimal::ZERO);
        assert_eq!(out.contributions.len(), 3);
    }

    #[test]
    fn test_single_commodity_move() {
        let mut curr = flat_prices();
        curr.insert("CL".into(), dec!(88));
        let out = daily_return(d(3), d(2), &weights(), &flat_prices(), &curr, &BTreeMap::new()).unwrap();
        // 0.5 * 0.10
        assert_eq!(out.excess_return, dec!(0.05));
        let cl = out.contributions.iter().find(|c| c.commodity == "CL").unwrap();
        assert_eq!(cl.price_relative, dec!(1.1));
    }

    #[test]
    fn test_roll_adjustment_multiplies_current_price() {
        let rolls = map(&[("CL", dec!(0.01))]);
        let out = daily_return(d(3), d(2), &weights(), &flat_prices(), &flat_prices(), &rolls).unwrap();
        // 0.5 * (1.01 - 1)
        assert_eq!(out.excess_return, dec!(0.005));
    }

    #[test]
    fn test_zero_weight_needs_no_price() {
        let w = map(&[("CL", Decimal::ONE), ("NG", Decimal::ZERO)]);
        let prices = map(&[("CL", dec!(80))]);
        let out = daily_return(d(3), d(2), &w, &prices, &prices, &BTreeMap::new()).unwrap();
        assert_eq!(out.contributions.len(), 1);
    }

    #[test]
    fn test_missing_current_price_names_commodity_and_date() {
        let mut curr = flat_prices();
        curr.remove("NG");
        let err = daily_return(d(3), d(2), &weights(), &flat_prices(), &curr, &BTreeMap::new())
            .unwrap_err();
        match err {
            GsciError::MissingPrice { commodity, date } => {
                assert_eq!(commodity, "NG");
                assert_eq!(date, d(3));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_missing_previous_price_names_previous_date() {
        let mut prev = flat_prices();
        prev.remove("GC");
        let err = daily_return(d(3), d(2), &weights(), &prev, &flat_prices(), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, GsciError::MissingPrice { date, .. } if date == d(2)));
    }

    #[test]
    fn test_reject_non_positive_price() {
        let mut curr = flat_prices();
        curr.insert("CL".into(), Decimal::ZERO);
        let err = daily_return(d(3), d(2), &weights(), &flat_prices(), &curr, &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, GsciError::MissingPrice { ref commodity, date } if commodity == "CL" && date == d(3)));

        let err = price_relative("NG", d(3), d(2), Some(dec!(-3)), Some(dec!(3)), Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, GsciError::MissingPrice { ref commodity, date } if commodity == "NG" && date == d(2)));
    }

    #[test]
    fn test_out_of_range_relative_is_an_error() {
        let err = price_relative(
            "CL",
            d(3),
            d(2),
            Some(dec!(0.0000000000000000000001)),
            Some(dec!(100000000000)),
            Decimal::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, GsciError::InvalidInput { ref field, .. } if field == "price"));
    }

    #[test]
    fn test_next_level_out_of_range_is_an_error() {
        let err = next_level(Decimal::MAX, dec!(0.5)).unwrap_err();
        assert!(matches!(err, GsciError::InvalidInput { ref field, .. } if field == "level"));
    }

    #[test]
    fn test_reject_roll_adjustment_wiping_out_relative() {
        assert!(price_relative("CL", d(3), d(2), Some(dec!(80)), Some(dec!(80)), dec!(-1)).is_err());
    }

    #[test]
    fn test_compose_variants() {
        let r = compose(dec!(0.01), dec!(0.0001), dec!(0.00005));
        assert_eq!(r.for_variant(IndexVariant::Excess), dec!(0.01));
        assert_eq!(r.for_variant(IndexVariant::Total), dec!(0.0101));
        assert_eq!(r.for_variant(IndexVariant::Enhanced), dec!(0.01015));
    }

    #[test]
    fn test_next_level_compounds() {
        assert_eq!(next_level(dec!(100), dec!(0.05)).unwrap(), dec!(105));
        let two_days = next_level(next_level(dec!(100), dec!(0.10)).unwrap(), dec!(-0.10)).unwrap();
        // multiplicative chaining, not additive
        assert_eq!(two_days, dec!(99));
    }

    #[test]
    fn test_next_level_rejects_total_loss() {
        assert!(next_level(dec!(100), dec!(-1)).is_err());
    }
}
