use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CommoditySpec;
use crate::error::GsciError;
use crate::index::returns::PriceMap;
use crate::types::*;
use crate::GsciResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Concentration limits checked against the index weights. Breaches are
/// reported, never corrected: the index weights are authoritative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_commodity_weight: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sector_weight: Option<Rate>,
}

impl RiskLimits {
    /// 25% per commodity, 60% per sector.
    pub fn standard() -> Self {
        Self {
            max_commodity_weight: Some(dec!(0.25)),
            max_sector_weight: Some(dec!(0.60)),
        }
    }
}

/// Input for sizing a portfolio that tracks the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioInput {
    pub date: NaiveDate,
    /// Capital to allocate across the basket
    pub target_notional: Money,
    /// Effective weights for `date`, typically `IndexState::final_weights`
    pub weights: WeightMap,
    /// Unit prices on `date`
    pub prices: PriceMap,
    /// Commodity metadata for contract sizes and sectors
    #[serde(default)]
    pub universe: Vec<CommoditySpec>,
    #[serde(default)]
    pub limits: RiskLimits,
}

/// One commodity holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub commodity: CommodityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<Sector>,
    pub weight: Decimal,
    pub notional: Money,
    pub price: Price,
    /// Units of the underlying: notional / price
    pub quantity: Decimal,
    /// quantity / contract size, when the contract size is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contracts: Option<Decimal>,
}

/// Aggregate exposure to one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorExposure {
    /// `None` groups commodities without a spec.
    pub sector: Option<Sector>,
    pub weight: Decimal,
    pub notional: Money,
    pub commodities: usize,
}

/// Output of portfolio construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioOutput {
    pub date: NaiveDate,
    pub target_notional: Money,
    pub invested_notional: Money,
    pub positions: Vec<Position>,
    /// Sorted by weight, largest first
    pub sector_breakdown: Vec<SectorExposure>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Size positions for `target_notional` from effective weights and unit prices.
///
/// notional_c = target_notional * w_c, quantity_c = notional_c / price_c.
/// Zero-weight commodities are skipped and need no price.
pub fn size_positions(
    date: NaiveDate,
    target_notional: Money,
    weights: &WeightMap,
    prices: &PriceMap,
    universe: &[CommoditySpec],
) -> GsciResult<Vec<Position>> {
    let mut positions = Vec::new();

    for (c, &w) in weights {
        if w < Decimal::ZERO {
            return Err(GsciError::InvalidWeight {
                date: Some(date),
                reason: format!("Negative weight {w} for {c}"),
            });
        }
        if w.is_zero() {
            continue;
        }
        let price = prices
            .get(c)
            .copied()
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| GsciError::MissingPrice {
                commodity: c.clone(),
                date,
            })?;

        let spec = universe.iter().find(|s| &s.symbol == c);
        let notional = target_notional * w;
        let quantity = notional / price;
        let contracts = spec
            .and_then(|s| s.contract_size)
            .filter(|size| !size.is_zero())
            .map(|size| quantity / size);

        positions.push(Position {
            commodity: c.clone(),
            sector: spec.map(|s| s.sector),
            weight: w,
            notional,
            price,
            quantity,
            contracts,
        });
    }

    Ok(positions)
}

/// Aggregate positions by sector, largest weight first.
pub fn sector_breakdown(positions: &[Position]) -> Vec<SectorExposure> {
    let mut by_sector: BTreeMap<Option<Sector>, SectorExposure> = BTreeMap::new();
    for p in positions {
        let entry = by_sector.entry(p.sector).or_insert(SectorExposure {
            sector: p.sector,
            weight: Decimal::ZERO,
            notional: Decimal::ZERO,
            commodities: 0,
        });
        entry.weight += p.weight;
        entry.notional += p.notional;
        entry.commodities += 1;
    }

    let mut out: Vec<SectorExposure> = by_sector.into_values().collect();
    out.sort_by(|a, b| b.weight.cmp(&a.weight));
    out
}

/// Build a tracking portfolio for one date.
pub fn construct_portfolio(
    input: &PortfolioInput,
) -> GsciResult<ComputationOutput<PortfolioOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_portfolio_input(input)?;

    let total = weight_sum(&input.weights);
    if (total - Decimal::ONE).abs() > WEIGHT_TOLERANCE {
        warnings.push(format!(
            "Weights sum to {total}; invested notional will differ from target"
        ));
    }

    let positions = size_positions(
        input.date,
        input.target_notional,
        &input.weights,
        &input.prices,
        &input.universe,
    )?;
    let breakdown = sector_breakdown(&positions);

    // Risk limits
    if let Some(max) = input.limits.max_commodity_weight {
        for p in positions.iter().filter(|p| p.weight > max) {
            warnings.push(format!(
                "{} weight {} exceeds max_commodity_weight {max}",
                p.commodity, p.weight
            ));
        }
    }
    if let Some(max) = input.limits.max_sector_weight {
        for s in breakdown.iter().filter(|s| s.weight > max) {
            let name = s
                .sector
                .map(|x| format!("{x:?}"))
                .unwrap_or_else(|| "Unclassified".into());
            warnings.push(format!(
                "Sector {name} weight {} exceeds max_sector_weight {max}",
                s.weight
            ));
        }
    }
    let unclassified = positions.iter().filter(|p| p.sector.is_none()).count();
    if unclassified > 0 && !input.universe.is_empty() {
        warnings.push(format!(
            "{unclassified} weighted commodities have no spec in the universe"
        ));
    }

    let invested_notional: Money = positions.iter().map(|p| p.notional).sum();
    debug!(
        date = %input.date,
        positions = positions.len(),
        %invested_notional,
        "portfolio sized"
    );

    let output = PortfolioOutput {
        date: input.date,
        target_notional: input.target_notional,
        invested_notional,
        positions,
        sector_breakdown: breakdown,
    };

    let assumptions = serde_json::json!({
        "target_notional": input.target_notional.to_string(),
        "limits": input.limits,
        "sizing": "notional = target * weight; quantity = notional / price",
    });

    Ok(with_metadata(
        "Index-tracking portfolio sized from effective weights",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_portfolio_input(input: &PortfolioInput) -> GsciResult<()> {
    if input.target_notional <= Decimal::ZERO {
        return Err(GsciError::InvalidInput {
            field: "target_notional".into(),
            reason: "Target notional must be positive".into(),
        });
    }
    if input.weights.is_empty() {
        return Err(GsciError::InsufficientData(
            "At least one weight is required".into(),
        ));
    }
    for (field, limit) in [
        ("max_commodity_weight", input.limits.max_commodity_weight),
        ("max_sector_weight", input.limits.max_sector_weight),
    ] {
        if let Some(l) = limit {
            if l <= Decimal::ZERO || l > Decimal::ONE {
                return Err(GsciError::InvalidInput {
                    field: field.into(),
                    reason: "Limit must be in (0, 1]".into(),
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    fn map(entries: &[(&str, Decimal)]) -> BTreeMap<CommodityId, Decimal> {
        entries.iter().map(|(c, v)| (c.to_string(), *v)).collect()
    }

    fn universe() -> Vec<CommoditySpec> {
        let mut cl = CommoditySpec::new("CL", Sector::Energy);
        cl.contract_size = Some(dec!(1000));
        let ng = CommoditySpec::new("NG", Sector::Energy);
        let mut gc = CommoditySpec::new("GC", Sector::PreciousMetals);
        gc.contract_size = Some(dec!(100));
        vec![cl, ng, gc]
    }

    fn input() -> PortfolioInput {
        PortfolioInput {
            date: date(),
            target_notional: dec!(1000000),
            weights: map(&[("CL", dec!(0.5)), ("NG", dec!(0.3)), ("GC", dec!(0.2))]),
            prices: map(&[("CL", dec!(80)), ("NG", dec!(3)), ("GC", dec!(2000))]),
            universe: universe(),
            limits: RiskLimits::default(),
        }
    }

    #[test]
    fn test_notional_and_quantity() {
        let out = construct_portfolio(&input()).unwrap();
        let cl = out.result.positions.iter().find(|p| p.commodity == "CL").unwrap();
        assert_eq!(cl.notional, dec!(500000));
        assert_eq!(cl.quantity, dec!(6250));
        assert_eq!(cl.contracts, Some(dec!(6.25)));
        let ng = out.result.positions.iter().find(|p| p.commodity == "NG").unwrap();
        assert_eq!(ng.quantity, dec!(100000));
        assert_eq!(ng.contracts, None);
        assert_eq!(out.result.invested_notional, dec!(1000000));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_sector_breakdown_sorted() {
        let out = construct_portfolio(&input()).unwrap();
        let sectors = &out.result.sector_breakdown;
        assert_eq!(sectors.len(), 2);
        assert_eq!(sectors[0].sector, Some(Sector::Energy));
        assert_eq!(sectors[0].weight, dec!(0.8));
        assert_eq!(sectors[0].commodities, 2);
        assert_eq!(sectors[1].notional, dec!(200000));
    }

    #[test]
    fn test_risk_limit_breaches_are_warnings() {
        let mut inp = input();
        inp.limits = RiskLimits::standard();
        let out = construct_portfolio(&inp).unwrap();
        // CL and NG above 25%, Energy above 60%
        assert_eq!(out.warnings.len(), 3);
        // weights untouched
        assert_eq!(out.result.positions[0].weight, inp.weights[&out.result.positions[0].commodity]);
    }

    #[test]
    fn test_zero_weight_skipped_without_price() {
        let mut inp = input();
        inp.weights.insert("SI".into(), Decimal::ZERO);
        let out = construct_portfolio(&inp).unwrap();
        assert_eq!(out.result.positions.len(), 3);
    }

    #[test]
    fn test_missing_price_fails() {
        let mut inp = input();
        inp.prices.remove("GC");
        let err = construct_portfolio(&inp).unwrap_err();
        assert!(matches!(err, GsciError::MissingPrice { ref commodity, .. } if commodity == "GC"));
    }

    #[test]
    fn test_reject_non_positive_notional() {
        let mut inp = input();
        inp.target_notional = Decimal::ZERO;
        assert!(construct_portfolio(&inp).is_err());
    }

    #[test]
    fn test_reject_out_of_range_limit() {
        let mut inp = input();
        inp.limits.max_sector_weight = Some(dec!(1.5));
        assert!(construct_portfolio(&inp).is_err());
    }

    #[test]
    fn test_weight_sum_warning() {
        let mut inp = input();
        inp.weights.insert("CL".into(), dec!(0.4));
        let out = construct_portfolio(&inp).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.result.invested_notional, dec!(900000));
    }
}
