use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::construction::Position;
use crate::error::GsciError;
use crate::index::sources::PriceSource;
use crate::types::{Money, Rate};
use crate::GsciResult;

/// Mark positions to market: sum of quantity * price(date).
pub fn portfolio_value<P: PriceSource + ?Sized>(
    positions: &[Position],
    date: NaiveDate,
    prices: &P,
) -> GsciResult<Money> {
    let mut value = Decimal::ZERO;
    for p in positions {
        let price = prices
            .price(date, &p.commodity)?
            .ok_or_else(|| GsciError::MissingPrice {
                commodity: p.commodity.clone(),
                date,
            })?;
        value += p.quantity * price;
    }
    Ok(value)
}

/// Simple return of fixed holdings between two dates.
pub fn portfolio_return<P: PriceSource + ?Sized>(
    positions: &[Position],
    date: NaiveDate,
    previous_date: NaiveDate,
    prices: &P,
) -> GsciResult<Rate> {
    let previous = portfolio_value(positions, previous_date, prices)?;
    if previous.is_zero() {
        return Err(GsciError::DivisionByZero {
            context: format!("portfolio value on {previous_date}"),
        });
    }
    let current = portfolio_value(positions, date, prices)?;
    Ok(current / previous - Decimal::ONE)
}
