//! Market data collaborators consumed by the calculator.
//!
//! One trait per data kind. The calculator is generic over all of them so a
//! live feed, an in-memory [`MarketDataSet`](super::market_data::MarketDataSet)
//! or a plain closure (via the `*_fn` adapters) can be plugged in without the
//! calculation core knowing the difference.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::GsciError;
use crate::types::{Price, Rate, WeightMap};
use crate::GsciResult;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Raw Contract Production Weights as of a date.
pub trait CpwSource {
    fn cpw(&self, date: NaiveDate) -> GsciResult<WeightMap>;
}

/// Settlement price of a commodity on a date. `None` when no observation exists.
pub trait PriceSource {
    fn price(&self, date: NaiveDate, commodity: &str) -> GsciResult<Option<Price>>;
}

/// Whether a Market Disruption Event is active for a commodity on a date.
pub trait DisruptionSource {
    fn is_disrupted(&self, date: NaiveDate, commodity: &str) -> GsciResult<bool>;
}

/// Simple daily collateral rate accruing from `date` to the next calculation date.
pub trait CollateralSource {
    fn daily_rate(&self, date: NaiveDate) -> GsciResult<Rate>;

    /// False for placeholder sources that cannot serve Total/Enhanced variants.
    fn is_available(&self) -> bool {
        true
    }
}

/// Roll cost/benefit folded into a commodity's price relative on a date.
pub trait RollAdjustmentSource {
    fn roll_adjustment(&self, date: NaiveDate, commodity: &str) -> GsciResult<Rate>;
}

/// Additive term applied on top of the Total Return to obtain the Enhanced Return.
pub trait Enhancement {
    fn adjustment(
        &self,
        date: NaiveDate,
        previous_date: NaiveDate,
        total_return: Rate,
    ) -> GsciResult<Rate>;
}

impl<T: CpwSource + ?Sized> CpwSource for &T {
    fn cpw(&self, date: NaiveDate) -> GsciResult<WeightMap> {
        (**self).cpw(date)
    }
}

impl<T: PriceSource + ?Sized> PriceSource for &T {
    fn price(&self, date: NaiveDate, commodity: &str) -> GsciResult<Option<Price>> {
        (**self).price(date, commodity)
    }
}

impl<T: DisruptionSource + ?Sized> DisruptionSource for &T {
    fn is_disrupted(&self, date: NaiveDate, commodity: &str) -> GsciResult<bool> {
        (**self).is_disrupted(date, commodity)
    }
}

impl<T: CollateralSource + ?Sized> CollateralSource for &T {
    fn daily_rate(&self, date: NaiveDate) -> GsciResult<Rate> {
        (**self).daily_rate(date)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

impl<T: RollAdjustmentSource + ?Sized> RollAdjustmentSource for &T {
    fn roll_adjustment(&self, date: NaiveDate, commodity: &str) -> GsciResult<Rate> {
        (**self).roll_adjustment(date, commodity)
    }
}

impl<T: Enhancement + ?Sized> Enhancement for &T {
    fn adjustment(
        &self,
        date: NaiveDate,
        previous_date: NaiveDate,
        total_return: Rate,
    ) -> GsciResult<Rate> {
        (**self).adjustment(date, previous_date, total_return)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// No disruption on any date.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDisruptions;

impl DisruptionSource for NoDisruptions {
    fn is_disrupted(&self, _date: NaiveDate, _commodity: &str) -> GsciResult<bool> {
        Ok(false)
    }
}

/// Placeholder for runs that only compute the Excess variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCollateral;

impl CollateralSource for NoCollateral {
    fn daily_rate(&self, _date: NaiveDate) -> GsciResult<Rate> {
        Err(GsciError::InvalidInput {
            field: "collateral".into(),
            reason: "Total and Enhanced variants require a collateral rate source".into(),
        })
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Zero roll adjustment everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRollAdjustment;

impl RollAdjustmentSource for NoRollAdjustment {
    fn roll_adjustment(&self, _date: NaiveDate, _commodity: &str) -> GsciResult<Rate> {
        Ok(Decimal::ZERO)
    }
}

/// Enhanced Return equal to Total Return.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnhancement;

impl Enhancement for NoEnhancement {
    fn adjustment(&self, _: NaiveDate, _: NaiveDate, _: Rate) -> GsciResult<Rate> {
        Ok(Decimal::ZERO)
    }
}

/// Annualized spread accrued over calendar days on an ACT/365 basis.
#[derive(Debug, Clone, Copy)]
pub struct AnnualizedSpread {
    pub annual_rate: Rate,
}

impl Enhancement for AnnualizedSpread {
    fn adjustment(&self, date: NaiveDate, previous_date: NaiveDate, _: Rate) -> GsciResult<Rate> {
        let days = (date - previous_date).num_days();
        Ok(self.annual_rate * Decimal::from(days) / Decimal::from(365))
    }
}

/// Either a configured spread or nothing, so a config value can pick the enhancement at runtime.
impl<E: Enhancement> Enhancement for Option<E> {
    fn adjustment(
        &self,
        date: NaiveDate,
        previous_date: NaiveDate,
        total_return: Rate,
    ) -> GsciResult<Rate> {
        match self {
            Some(e) => e.adjustment(date, previous_date, total_return),
            None => Ok(Decimal::ZERO),
        }
    }
}

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

/// Wraps a closure so it can serve as any of the source traits.
#[derive(Debug, Clone, Copy)]
pub struct FnSource<F>(pub F);

pub fn cpw_fn<F: Fn(NaiveDate) -> WeightMap>(f: F) -> FnSource<F> {
    FnSource(f)
}

pub fn price_fn<F: Fn(NaiveDate, &str) -> Option<Price>>(f: F) -> FnSource<F> {
    FnSource(f)
}

pub fn disruption_fn<F: Fn(NaiveDate, &str) -> bool>(f: F) -> FnSource<F> {
    FnSource(f)
}

pub fn collateral_fn<F: Fn(NaiveDate) -> Rate>(f: F) -> FnSource<F> {
    FnSource(f)
}

pub fn roll_fn<F: Fn(NaiveDate, &str) -> Rate>(f: F) -> FnSource<F> {
    FnSource(f)
}

pub fn enhancement_fn<F: Fn(NaiveDate, NaiveDate, Rate) -> Rate>(f: F) -> FnSource<F> {
    FnSource(f)
}

impl<F: Fn(NaiveDate) -> WeightMap> CpwSource for FnSource<F> {
    fn cpw(&self, date: NaiveDate) -> GsciResult<WeightMap> {
        Ok((self.0)(date))
    }
}

impl<F: Fn(NaiveDate, &str) -> Option<Price>> PriceSource for FnSource<F> {
    fn price(&self, date: NaiveDate, commodity: &str) -> GsciResult<Option<Price>> {
        Ok((self.0)(date, commodity))
    }
}

impl<F: Fn(NaiveDate, &str) -> bool> DisruptionSource for FnSource<F> {
    fn is_disrupted(&self, date: NaiveDate, commodity: &str) -> GsciResult<bool> {
        Ok((self.0)(date, commodity))
    }
}

impl<F: Fn(NaiveDate) -> Rate> CollateralSource for FnSource<F> {
    fn daily_rate(&self, date: NaiveDate) -> GsciResult<Rate> {
        Ok((self.0)(date))
    }
}

impl<F: Fn(NaiveDate, &str) -> Rate> RollAdjustmentSource for FnSource<F> {
    fn roll_adjustment(&self, date: NaiveDate, commodity: &str) -> GsciResult<Rate> {
        Ok((self.0)(date, commodity))
    }
}

impl<F: Fn(NaiveDate, NaiveDate, Rate) -> Rate> Enhancement for FnSource<F> {
    fn adjustment(
        &self,
        date: NaiveDate,
        previous_date: NaiveDate,
        total_return: Rate,
    ) -> GsciResult<Rate> {
        Ok((self.0)(date, previous_date, total_return))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_annualized_spread_accrues_calendar_days() {
        let spread = AnnualizedSpread {
            annual_rate: dec!(0.0365),
        };
        // Friday -> Monday: 3 calendar days
        let adj = spread.adjustment(d(8), d(5), Decimal::ZERO).unwrap();
        assert_eq!(adj, dec!(0.0003));
    }

    #[test]
    fn test_optional_enhancement_none_is_zero() {
        let none: Option<AnnualizedSpread> = None;
        assert_eq!(none.adjustment(d(2), d(1), dec!(0.01)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_no_collateral_is_unavailable() {
        assert!(!NoCollateral.is_available());
        assert!(NoCollateral.daily_rate(d(2)).is_err());
    }

    #[test]
    fn test_closure_adapters() {
        let prices = price_fn(|_, c| if c == "CL" { Some(dec!(80)) } else { None });
        assert_eq!(prices.price(d(2), "CL").unwrap(), Some(dec!(80)));
        assert_eq!(prices.price(d(2), "NG").unwrap(), None);

        let collateral = collateral_fn(|_| dec!(0.0001));
        assert!(collateral.is_available());
        assert_eq!(collateral.daily_rate(d(2)).unwrap(), dec!(0.0001));
    }

    #[test]
    fn test_reference_forwards() {
        let prices = price_fn(|_, _| Some(dec!(3)));
        let by_ref = &prices;
        assert_eq!(by_ref.price(d(2), "NG").unwrap(), Some(dec!(3)));
    }
}
