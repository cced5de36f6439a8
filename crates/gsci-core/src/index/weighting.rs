//! Contract Production Weight normalization.
//!
//! Covers:
//! 1. **Normalization** -- target_i = cpw_i / sum(cpw)
//! 2. **Universe restriction** -- CPW mappings must cover exactly the configured universe
//! 3. **Reconstitution detection** -- whether two target mappings differ beyond tolerance
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::Decimal;

use crate::error::GsciError;
use crate::types::{weight_sum, CommodityId, WeightMap};
use crate::GsciResult;

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize raw CPW values into target weights summing to one.
///
/// Fails if any weight is negative or if the total is zero.
pub fn normalize(cpw: &WeightMap) -> GsciResult<WeightMap> {
    validate_cpw(cpw)?;

    let total = weight_sum(cpw);
    if total.is_zero() {
        return Err(GsciError::InvalidWeight {
            date: None,
            reason: "Total CPW is zero; cannot normalize".into(),
        });
    }

    Ok(cpw.iter().map(|(c, w)| (c.clone(), *w / total)).collect())
}

/// Normalize a CPW mapping that must cover exactly `universe`.
pub fn normalize_universe(cpw: &WeightMap, universe: &[CommodityId]) -> GsciResult<WeightMap> {
    for c in universe {
        if !cpw.contains_key(c) {
            return Err(GsciError::InvalidWeight {
                date: None,
                reason: format!("No CPW provided for {c}"),
            });
        }
    }
    if let Some(extra) = cpw.keys().find(|c| !universe.contains(*c)) {
        return Err(GsciError::InvalidWeight {
            date: None,
            reason: format!("CPW provided for {extra}, which is outside the index universe"),
        });
    }
    normalize(cpw)
}

/// True when any commodity's weight differs by more than `tolerance` between
/// the two mappings. Missing entries count as zero.
pub fn targets_changed(previous: &WeightMap, current: &WeightMap, tolerance: Decimal) -> bool {
    previous
        .keys()
        .chain(current.keys())
        .any(|c| {
            let a = previous.get(c).copied().unwrap_or(Decimal::ZERO);
            let b = current.get(c).copied().unwrap_or(Decimal::ZERO);
            (a - b).abs() > tolerance
        })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_cpw(cpw: &WeightMap) -> GsciResult<()> {
    if cpw.is_empty() {
        return Err(GsciError::InvalidWeight {
            date: None,
            reason: "CPW mapping is empty".into(),
        });
    }
    for (c, w) in cpw {
        if *w < Decimal::ZERO {
            return Err(GsciError::InvalidWeight {
                date: None,
                reason: format!("Negative CPW {w} for {c}"),
            });
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
    use crate::types::WEIGHT_TOLERANCE;
    use rust_decimal_macros::dec;

    fn approx_eq(a: Decimal, b: Decimal, eps: Decimal) -> bool {
        (a - b).abs() < eps
    }

    fn cpw(entries: &[(&str, Decimal)]) -> WeightMap {
        entries.iter().map(|(c, w)| (c.to_string(), *w)).collect()
    }

    fn universe(symbols: &[&str]) -> Vec<CommodityId> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_already_unit_sum() {
        let out = normalize(&cpw(&[("CL", dec!(0.5)), ("NG", dec!(0.3)), ("GC", dec!(0.2))])).unwrap();
        assert_eq!(out["CL"], dec!(0.5));
        assert_eq!(out["NG"], dec!(0.3));
        assert_eq!(out["GC"], dec!(0.2));
    }

    #[test]
    fn test_normalize_raw_production_weights() {
        // 600 / 1000, 300 / 1000, 100 / 1000
        let out = normalize(&cpw(&[("CL", dec!(600)), ("NG", dec!(300)), ("GC", dec!(100))])).unwrap();
        assert_eq!(out["CL"], dec!(0.6));
        assert_eq!(out["NG"], dec!(0.3));
        assert_eq!(out["GC"], dec!(0.1));
    }

    #[test]
    fn test_normalize_sums_to_one_with_repeating_fraction() {
        let out = normalize(&cpw(&[("A", dec!(1)), ("B", dec!(1)), ("C", dec!(1))])).unwrap();
        assert!(approx_eq(weight_sum(&out), Decimal::ONE, WEIGHT_TOLERANCE));
        assert!(out.values().all(|w| *w >= Decimal::ZERO));
    }

    #[test]
    fn test_normalize_keeps_zero_weight_entries() {
        let out = normalize(&cpw(&[("CL", dec!(2)), ("NG", Decimal::ZERO)])).unwrap();
        assert_eq!(out["CL"], Decimal::ONE);
        assert_eq!(out["NG"], Decimal::ZERO);
    }

    #[test]
    fn test_reject_negative_weight() {
        let err = normalize(&cpw(&[("CL", dec!(1)), ("NG", dec!(-0.1))])).unwrap_err();
        assert!(matches!(err, GsciError::InvalidWeight { .. }));
    }

    #[test]
    fn test_reject_all_zero() {
        let err = normalize(&cpw(&[("CL", Decimal::ZERO), ("NG", Decimal::ZERO)])).unwrap_err();
        assert!(matches!(err, GsciError::InvalidWeight { .. }));
    }

    #[test]
    fn test_reject_empty() {
        assert!(normalize(&WeightMap::new()).is_err());
    }

    #[test]
    fn test_universe_missing_commodity() {
        let err = normalize_universe(&cpw(&[("CL", dec!(1))]), &universe(&["CL", "NG"])).unwrap_err();
        assert!(err.to_string().contains("NG"));
    }

    #[test]
    fn test_universe_extra_commodity() {
        let err = normalize_universe(
            &cpw(&[("CL", dec!(1)), ("XX", dec!(1))]),
            &universe(&["CL"]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("XX"));
    }

    #[test]
    fn test_targets_changed() {
        let a = cpw(&[("CL", dec!(0.5)), ("NG", dec!(0.5))]);
        let b = cpw(&[("CL", dec!(0.6)), ("NG", dec!(0.4))]);
        assert!(targets_changed(&a, &b, WEIGHT_TOLERANCE));
        assert!(!targets_changed(&a, &a.clone(), WEIGHT_TOLERANCE));
    }

    #[test]
    fn test_targets_changed_missing_entry_counts_as_zero() {
        let a = cpw(&[("CL", Decimal::ONE), ("NG", Decimal::ZERO)]);
        let b = cpw(&[("CL", Decimal::ONE)]);
        assert!(!targets_changed(&a, &b, WEIGHT_TOLERANCE));
    }
}
