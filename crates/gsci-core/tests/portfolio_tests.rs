use chrono::NaiveDate;
use gsci_core::index::{IndexCalculator, MarketDataSet};
use gsci_core::portfolio::{construct_portfolio, portfolio_return, PortfolioInput, RiskLimits};
use gsci_core::{CommoditySpec, IndexConfig, IndexVariant, Sector};
use rust_decimal_macros::dec;

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
}

fn universe() -> Vec<CommoditySpec> {
    let mut cl = CommoditySpec::new("CL", Sector::Energy);
    cl.contract_size = Some(dec!(1000));
    let mut gc = CommoditySpec::new("GC", Sector::PreciousMetals);
    gc.contract_size = Some(dec!(100));
    let mut lc = CommoditySpec::new("LC", Sector::Livestock);
    lc.contract_size = Some(dec!(40000));
    vec![cl, gc, lc]
}

fn data() -> MarketDataSet {
    let cpw = [("CL", dec!(6)), ("GC", dec!(3)), ("LC", dec!(1))]
        .into_iter()
        .map(|(c, w)| (c.to_string(), w))
        .collect();
    MarketDataSet::new()
        .with_cpw(day(1), cpw)
        .with_price(day(1), "CL", dec!(80))
        .with_price(day(1), "GC", dec!(2000))
        .with_price(day(1), "LC", dec!(2))
        .with_price(day(2), "CL", dec!(84))
        .with_price(day(2), "GC", dec!(2000))
        .with_price(day(2), "LC", dec!(2))
}

// ===========================================================================
// Portfolio sized from index output
// ===========================================================================

#[test]
fn test_portfolio_tracks_index_return() {
    let data = data();
    let config = IndexConfig::new(universe());
    let calc = IndexCalculator::new(config, &data, &data, &data).unwrap();
    let state = calc
        .compute(&[day(1)], dec!(100), &[IndexVariant::Excess])
        .unwrap();

    let input = PortfolioInput {
        date: day(1),
        target_notional: dec!(10000000),
        weights: state.final_weights.clone(),
        prices: data.prices[&day(1)].clone(),
        universe: universe(),
        limits: RiskLimits::default(),
    };
    let out = construct_portfolio(&input).unwrap();
    let positions = &out.result.positions;
    assert_eq!(positions.len(), 3);

    let cl = positions.iter().find(|p| p.commodity == "CL").unwrap();
    assert_eq!(cl.notional, dec!(6000000));
    assert_eq!(cl.contracts, Some(dec!(75)));

    // held quantities earn the index's day-2 excess return
    let r = portfolio_return(positions, day(2), day(1), &data).unwrap();
    let index_r = calc.index_return(day(2), day(1), IndexVariant::Excess).unwrap();
    assert_eq!(r, index_r);
    assert_eq!(r, dec!(0.03));
}

#[test]
fn test_standard_limits_flag_concentration() {
    let data = data();
    let calc =
        IndexCalculator::new(IndexConfig::new(universe()), &data, &data, &data).unwrap();
    let state = calc
        .compute(&[day(1)], dec!(100), &[IndexVariant::Excess])
        .unwrap();

    let input = PortfolioInput {
        date: day(1),
        target_notional: dec!(1000000),
        weights: state.final_weights,
        prices: data.prices[&day(1)].clone(),
        universe: universe(),
        limits: RiskLimits::standard(),
    };
    let out = construct_portfolio(&input).unwrap();
    // CL 60% and GC 30% breach 25%; no sector above 60%
    assert_eq!(out.warnings.len(), 2);
    assert_eq!(out.result.sector_breakdown[0].sector, Some(Sector::Energy));
}
