//! Daily rebalancing toward target weights.
//!
//! Covers:
//! 1. **Freeze** -- disrupted commodities carry their prior effective weight unchanged
//! 2. **Redistribution** -- the remaining mass goes to free commodities pro rata to target
//! 3. **Fallback** -- equal split when every free commodity has zero target weight
//!
//! Re-run every calculation date, not only when a disruption starts: a frozen
//! weight persists for the whole disruption window and the free block has to
//! absorb whatever it leaves.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GsciError;
use crate::types::{weight_sum, CommodityId, WeightMap};
use crate::GsciResult;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Effective weights for a date plus any numerical findings along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceOutcome {
    pub weights: WeightMap,
    /// Sum of frozen weights carried forward.
    pub reserved: Decimal,
    /// Mass distributed among free commodities.
    pub available: Decimal,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Derive the effective weights for `date`.
///
/// The universe is the key set of `target`. Commodities in `frozen` keep their
/// entry from `prior` bit for bit; the rest share `1 - reserved` in proportion
/// to their target weights renormalized over the free subset.
pub fn rebalance(
    date: NaiveDate,
    prior: &WeightMap,
    target: &WeightMap,
    frozen: &BTreeSet<CommodityId>,
    tolerance: Decimal,
) -> GsciResult<RebalanceOutcome> {
    let mut warnings: Vec<String> = Vec::new();
    let mut weights = WeightMap::new();

    // --- Frozen block ---
    for c in frozen {
        let w = prior
            .get(c)
            .copied()
            .ok_or_else(|| GsciError::MissingPriorWeight {
                commodity: c.clone(),
                date,
            })?;
        weights.insert(c.clone(), w);
    }
    let reserved = weight_sum(&weights);

    let mut available = Decimal::ONE - reserved;
    if available < Decimal::ZERO {
        let msg = format!(
            "{date}: frozen weights sum to {reserved}; clamping available mass {available} to zero"
        );
        warn!(%date, %reserved, %available, "frozen weights exceed unity, clamping");
        warnings.push(msg);
        available = Decimal::ZERO;
    }

    // --- Free block ---
    let free: Vec<&CommodityId> = target.keys().filter(|c| !frozen.contains(*c)).collect();
    let free_target_sum: Decimal = free
        .iter()
        .map(|c| target.get(*c).copied().unwrap_or(Decimal::ZERO))
        .sum();

    if free.is_empty() {
        if available > tolerance {
            let msg = format!(
                "{date}: every commodity is frozen; {available} of unallocated weight left unassigned"
            );
            warn!(%date, %available, "no free commodity to absorb available weight");
            warnings.push(msg);
        }
    } else if free_target_sum.is_zero() {
        let share = available / Decimal::from(free.len() as u64);
        for c in &free {
            weights.insert((*c).clone(), share);
        }
        if available > Decimal::ZERO {
            warnings.push(format!(
                "{date}: free commodities have zero target weight; split {available} equally"
            ));
        }
    } else {
        for c in &free {
            let t = target.get(*c).copied().unwrap_or(Decimal::ZERO);
            weights.insert((*c).clone(), available * t / free_target_sum);
        }
    }

    let total = weight_sum(&weights);
    if (total - Decimal::ONE).abs() > tolerance {
        warn!(%date, %total, "effective weights outside tolerance");
        warnings.push(format!(
            "{date}: effective weights sum to {total}, outside tolerance {tolerance}"
        ));
    }

    Ok(RebalanceOutcome {
        weights,
        reserved,
        available,
        warnings,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
