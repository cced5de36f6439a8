//! Market Disruption Event handling.
//!
//! A commodity under an active MDE is *frozen*: it keeps its prior effective
//! weight instead of moving toward its target. Everything else is *free*.
//! Record date ranges are closed on both ends; a record without an end date
//! is still open and covers every date from its start onward.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::sources::DisruptionSource;
use crate::error::GsciError;
use crate::types::{CommodityId, WeightMap};
use crate::GsciResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisruptionKind {
    TradingHalt,
    ForceMajeure,
    ExchangeClosure,
    SettlementFailure,
    #[default]
    Other,
}

/// A dated disruption for one commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDisruptionEvent {
    pub commodity: CommodityId,
    #[serde(default)]
    pub kind: DisruptionKind,
    pub start: NaiveDate,
    /// Last disrupted date (inclusive). `None` while unresolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MarketDisruptionEvent {
    pub fn new(commodity: impl Into<CommodityId>, start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self {
            commodity: commodity.into(),
            kind: DisruptionKind::Other,
            start,
            end,
            description: None,
        }
    }

    /// Closed-interval containment.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.overlaps(date, date)
    }

    /// True when the event covers any date in `[start, end]`.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start <= end && self.end.map_or(true, |last| last >= start)
    }

    pub fn validate(&self) -> GsciResult<()> {
        if let Some(end) = self.end {
            if end < self.start {
                return Err(GsciError::InvalidInput {
                    field: "mde.end".into(),
                    reason: format!(
                        "Disruption for {} ends ({end}) before it starts ({})",
                        self.commodity, self.start
                    ),
                });
            }
        }
        Ok(())
    }
}

impl DisruptionSource for [MarketDisruptionEvent] {
    fn is_disrupted(&self, date: NaiveDate, commodity: &str) -> GsciResult<bool> {
        Ok(!events_between(self, commodity, date, date).is_empty())
    }
}

impl DisruptionSource for Vec<MarketDisruptionEvent> {
    fn is_disrupted(&self, date: NaiveDate, commodity: &str) -> GsciResult<bool> {
        self.as_slice().is_disrupted(date, commodity)
    }
}

/// Records overlapping `[start, end]` for one commodity.
pub fn events_between<'a>(
    events: &'a [MarketDisruptionEvent],
    commodity: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<&'a MarketDisruptionEvent> {
    events
        .iter()
        .filter(|e| e.commodity == commodity && e.overlaps(start, end))
        .collect()
}

/// Frozen/free split of the universe for one date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisruptionPartition {
    pub frozen: BTreeSet<CommodityId>,
    pub free: BTreeSet<CommodityId>,
}

impl DisruptionPartition {
    /// Every commodity free (bootstrap date).
    pub fn all_free(commodities: &[CommodityId]) -> Self {
        Self {
            frozen: BTreeSet::new(),
            free: commodities.iter().cloned().collect(),
        }
    }

    pub fn is_frozen(&self, commodity: &str) -> bool {
        self.frozen.contains(commodity)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Split `commodities` into frozen and free on `date`.
///
/// Only commodities that already carry a prior effective weight can be frozen;
/// with `prior` absent (first date of a run) every commodity is free.
pub fn classify<D: DisruptionSource + ?Sized>(
    date: NaiveDate,
    commodities: &[CommodityId],
    disruptions: &D,
    prior: Option<&WeightMap>,
) -> GsciResult<DisruptionPartition> {
    let Some(prior) = prior else {
        return Ok(DisruptionPartition::all_free(commodities));
    };

    let mut partition = DisruptionPartition::default();
    for c in commodities {
        if prior.contains_key(c) && disruptions.is_disrupted(date, c)? {
            partition.frozen.insert(c.clone());
        } else {
            partition.free.insert(c.clone());
        }
    }
    Ok(partition)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn universe() -> Vec<CommodityId> {
        vec!["CL".into(), "NG".into(), "GC".into()]
    }

    fn prior() -> WeightMap {
        [("CL", dec!(0.5)), ("NG", dec!(0.3)), ("GC", dec!(0.2))]
            .into_iter()
            .map(|(c, w)| (c.to_string(), w))
            .collect()
    }

    #[test]
    fn test_closed_interval_bounds() {
        let e = MarketDisruptionEvent::new("NG", d(3), Some(d(5)));
        assert!(!e.contains(d(2)));
        assert!(e.contains(d(3)));
        assert!(e.contains(d(4)));
        assert!(e.contains(d(5)));
        assert!(!e.contains(d(6)));
    }

    #[test]
    fn test_open_ended_event() {
        let e = MarketDisruptionEvent::new("NG", d(3), None);
        assert!(e.contains(d(3)));
        assert!(e.contains(d(31)));
        assert!(!e.contains(d(2)));
    }

    #[test]
    fn test_single_day_event() {
        let e = MarketDisruptionEvent::new("NG", d(3), Some(d(3)));
        assert!(e.contains(d(3)));
        assert!(!e.contains(d(4)));
    }

    #[test]
    fn test_record_list_source_uses_closed_bounds() {
        let events = vec![
            MarketDisruptionEvent::new("NG", d(3), Some(d(5))),
            MarketDisruptionEvent::new("CL", d(10), None),
        ];
        assert!(!events.is_disrupted(d(2), "NG").unwrap());
        assert!(events.is_disrupted(d(3), "NG").unwrap());
        assert!(events.is_disrupted(d(5), "NG").unwrap());
        assert!(!events.is_disrupted(d(6), "NG").unwrap());
        assert!(events.is_disrupted(d(31), "CL").unwrap());
        assert!(!events.is_disrupted(d(4), "GC").unwrap());
    }

    #[test]
    fn test_reject_inverted_range() {
        let e = MarketDisruptionEvent::new("NG", d(5), Some(d(3)));
        assert!(e.validate().is_err());
    }

    #[test]
    fn test_classify_partitions_universe() {
        let events = vec![MarketDisruptionEvent::new("NG", d(3), Some(d(4)))];
        let p = classify(d(3), &universe(), &events, Some(&prior())).unwrap();
        assert_eq!(p.frozen.len(), 1);
        assert!(p.is_frozen("NG"));
        assert_eq!(p.free.len(), 2);
        assert!(p.frozen.is_disjoint(&p.free));
    }

    #[test]
    fn test_classify_bootstrap_all_free() {
        let events = vec![MarketDisruptionEvent::new("NG", d(1), None)];
        let p = classify(d(3), &universe(), &events, None).unwrap();
        assert!(p.frozen.is_empty());
        assert_eq!(p.free.len(), 3);
    }

    #[test]
    fn test_classify_without_prior_entry_is_free() {
        let events = vec![MarketDisruptionEvent::new("NG", d(1), None)];
        let mut partial = prior();
        partial.remove("NG");
        let p = classify(d(3), &universe(), &events, Some(&partial)).unwrap();
        assert!(!p.is_frozen("NG"));
    }

    #[test]
    fn test_event_for_other_commodity_ignored() {
        let events = vec![MarketDisruptionEvent::new("XX", d(1), None)];
        let p = classify(d(3), &universe(), &events, Some(&prior())).unwrap();
        assert!(p.frozen.is_empty());
    }

    #[test]
    fn test_events_between_overlap() {
        let events = vec![
            MarketDisruptionEvent::new("NG", d(1), Some(d(2))),
            MarketDisruptionEvent::new("NG", d(10), None),
            MarketDisruptionEvent::new("CL", d(3), Some(d(4))),
        ];
        assert_eq!(events_between(&events, "NG", d(2), d(5)).len(), 1);
        assert_eq!(events_between(&events, "NG", d(2), d(12)).len(), 2);
        assert!(events_between(&events, "GC", d(1), d(31)).is_empty());
    }
}
