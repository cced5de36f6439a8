//! In-memory market data set implementing every source trait.
//!
//! Used by the CLI and the bindings (deserialized from JSON/YAML) and by tests.
//! CPW mappings are looked up *as of* a date: the latest mapping dated on or
//! before the request applies, matching how production weights only change at
//! reconstitution. Collateral rates and prices are exact-date lookups.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::disruption::MarketDisruptionEvent;
use super::returns::PriceMap;
use super::sources::{
    CollateralSource, CpwSource, DisruptionSource, PriceSource, RollAdjustmentSource,
};
use crate::error::GsciError;
use crate::types::{CommodityId, Price, Rate, WeightMap};
use crate::GsciResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketDataSet {
    /// Effective date → raw CPW mapping.
    #[serde(default)]
    pub cpw: BTreeMap<NaiveDate, WeightMap>,
    /// Date → commodity → settlement price.
    #[serde(default)]
    pub prices: BTreeMap<NaiveDate, PriceMap>,
    #[serde(default)]
    pub disruptions: Vec<MarketDisruptionEvent>,
    /// Date → simple daily collateral rate.
    #[serde(default)]
    pub collateral_rates: BTreeMap<NaiveDate, Rate>,
    /// Date → commodity → roll adjustment. Absent entries are zero.
    #[serde(default)]
    pub roll_adjustments: BTreeMap<NaiveDate, BTreeMap<CommodityId, Rate>>,
}

impl MarketDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cpw(mut self, effective: NaiveDate, cpw: WeightMap) -> Self {
        self.cpw.insert(effective, cpw);
        self
    }

    pub fn with_price(mut self, date: NaiveDate, commodity: &str, price: Price) -> Self {
        self.prices
            .entry(date)
            .or_default()
            .insert(commodity.to_string(), price);
        self
    }

    /// Same prices for every date in `dates`.
    pub fn with_flat_prices(mut self, dates: &[NaiveDate], prices: &PriceMap) -> Self {
        for d in dates {
            self.prices.entry(*d).or_default().extend(prices.clone());
        }
        self
    }

    pub fn with_disruption(mut self, event: MarketDisruptionEvent) -> Self {
        self.disruptions.push(event);
        self
    }

    pub fn with_collateral(mut self, date: NaiveDate, rate: Rate) -> Self {
        self.collateral_rates.insert(date, rate);
        self
    }

    pub fn with_roll_adjustment(mut self, date: NaiveDate, commodity: &str, adj: Rate) -> Self {
        self.roll_adjustments
            .entry(date)
            .or_default()
            .insert(commodity.to_string(), adj);
        self
    }

    /// Every date carrying at least one price, ascending.
    pub fn price_dates(&self) -> Vec<NaiveDate> {
        self.prices.keys().copied().collect()
    }

    pub fn has_collateral(&self) -> bool {
        !self.collateral_rates.is_empty()
    }

    pub fn validate(&self) -> GsciResult<()> {
        if self.cpw.is_empty() {
            return Err(GsciError::InsufficientData(
                "Market data set has no CPW mapping".into(),
            ));
        }
        for event in &self.disruptions {
            event.validate()?;
        }
        Ok(())
    }
}

impl CpwSource for MarketDataSet {
    fn cpw(&self, date: NaiveDate) -> GsciResult<WeightMap> {
        self.cpw
            .range(..=date)
            .next_back()
            .map(|(_, m)| m.clone())
            .ok_or_else(|| GsciError::DataSource {
                source_kind: "cpw".into(),
                reason: format!("No CPW mapping effective on or before {date}"),
            })
    }
}

impl PriceSource for MarketDataSet {
    fn price(&self, date: NaiveDate, commodity: &str) -> GsciResult<Option<Price>> {
        Ok(self.prices.get(&date).and_then(|p| p.get(commodity)).copied())
    }
}

impl DisruptionSource for MarketDataSet {
    fn is_disrupted(&self, date: NaiveDate, commodity: &str) -> GsciResult<bool> {
        self.disruptions.is_disrupted(date, commodity)
    }
}

impl CollateralSource for MarketDataSet {
    fn daily_rate(&self, date: NaiveDate) -> GsciResult<Rate> {
        self.collateral_rates
            .get(&date)
            .copied()
            .ok_or_else(|| GsciError::DataSource {
                source_kind: "collateral".into(),
                reason: format!("No collateral rate for {date}"),
            })
    }

    fn is_available(&self) -> bool {
        self.has_collateral()
    }
}

impl RollAdjustmentSource for MarketDataSet {
    fn roll_adjustment(&self, date: NaiveDate, commodity: &str) -> GsciResult<Rate> {
        Ok(self
            .roll_adjustments
            .get(&date)
            .and_then(|m| m.get(commodity))
            .copied()
            .unwrap_or(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn weights(cl: Decimal, ng: Decimal) -> WeightMap {
        [("CL".to_string(), cl), ("NG".to_string(), ng)].into_iter().collect()
    }

    #[test]
    fn test_cpw_as_of_lookup() {
        let data = MarketDataSet::new()
            .with_cpw(d(1, 1), weights(dec!(0.6), dec!(0.4)))
            .with_cpw(d(7, 1), weights(dec!(0.5), dec!(0.5)));
        assert_eq!(data.cpw(d(3, 15)).unwrap()["CL"], dec!(0.6));
        assert_eq!(data.cpw(d(7, 1)).unwrap()["CL"], dec!(0.5));
        assert_eq!(data.cpw(d(12, 31)).unwrap()["CL"], dec!(0.5));
        assert!(data.cpw(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()).is_err());
    }

    #[test]
    fn test_price_lookup_exact_date() {
        let data = MarketDataSet::new().with_price(d(1, 2), "CL", dec!(80));
        assert_eq!(data.price(d(1, 2), "CL").unwrap(), Some(dec!(80)));
        assert_eq!(data.price(d(1, 3), "CL").unwrap(), None);
        assert_eq!(data.price(d(1, 2), "NG").unwrap(), None);
    }

    #[test]
    fn test_collateral_availability() {
        let empty = MarketDataSet::new();
        assert!(!empty.is_available());
        let data = MarketDataSet::new().with_collateral(d(1, 2), dec!(0.0001));
        assert!(data.is_available());
        assert_eq!(data.daily_rate(d(1, 2)).unwrap(), dec!(0.0001));
        assert!(data.daily_rate(d(1, 3)).is_err());
    }

    #[test]
    fn test_roll_adjustment_defaults_to_zero() {
        let data = MarketDataSet::new().with_roll_adjustment(d(1, 5), "CL", dec!(-0.002));
        assert_eq!(data.roll_adjustment(d(1, 5), "CL").unwrap(), dec!(-0.002));
        assert_eq!(data.roll_adjustment(d(1, 5), "NG").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{
            "cpw": { "2024-01-01": { "CL": "0.6", "NG": 0.4 } },
            "prices": { "2024-01-02": { "CL": 80, "NG": "3.1" } },
            "disruptions": [ { "commodity": "NG", "kind": "trading_halt", "start": "2024-01-03" } ],
            "collateral_rates": { "2024-01-02": 0.0001 }
        }"#;
        let data: MarketDataSet = serde_json::from_str(json).unwrap();
        assert!(data.validate().is_ok());
        assert_eq!(data.price(d(1, 2), "NG").unwrap(), Some(dec!(3.1)));
        assert!(data.is_disrupted(d(1, 4), "NG").unwrap());
        assert!(!data.is_disrupted(d(1, 2), "NG").unwrap());
    }
}
