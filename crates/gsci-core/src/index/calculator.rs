//! Index calculator: drives normalization, disruption filtering, rebalancing
//! and return composition across a date sequence.
//!
//! A run moves through `Uninitialized -> Bootstrapped -> Running -> Finalized`.
//! Each date is evaluated against the run's state without mutating it and only
//! committed once every stage has succeeded, so a failing date leaves the run
//! exactly as it was after the previous date.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::disruption::classify;
use super::market_data::MarketDataSet;
use super::rebalancing::rebalance;
use super::returns::{compose, daily_return, next_level, CommodityContribution, DailyReturns, PriceMap};
use super::sources::{
    AnnualizedSpread, CollateralSource, CpwSource, DisruptionSource, Enhancement, NoCollateral,
    NoEnhancement, NoRollAdjustment, PriceSource, RollAdjustmentSource,
};
use super::weighting::{normalize_universe, targets_changed};
use crate::config::IndexConfig;
use crate::error::GsciError;
use crate::types::{
    weight_sum, with_metadata, CommodityId, ComputationOutput, IndexVariant, Level, Rate, WeightMap,
};
use crate::GsciResult;

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Uninitialized,
    Bootstrapped,
    Running,
    Finalized,
}

/// One observation of a variant's level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPoint {
    pub date: NaiveDate,
    pub level: Level,
    /// Return that produced this level; zero on the bootstrap date.
    pub day_return: Rate,
}

/// Weights in force at the close of a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSnapshot {
    pub date: NaiveDate,
    pub target: WeightMap,
    pub effective: WeightMap,
    pub frozen: Vec<CommodityId>,
    /// Target weights changed versus the previous date (or first date of the run).
    pub reconstitution: bool,
}

/// Accumulated result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexState {
    pub index_name: String,
    pub phase: RunPhase,
    pub variants: Vec<IndexVariant>,
    pub levels: BTreeMap<IndexVariant, Vec<LevelPoint>>,
    pub weights: Vec<WeightSnapshot>,
    pub final_weights: WeightMap,
    pub warnings: Vec<String>,
}

impl IndexState {
    pub fn history(&self, variant: IndexVariant) -> Option<&[LevelPoint]> {
        self.levels.get(&variant).map(Vec::as_slice)
    }

    pub fn level_on(&self, variant: IndexVariant, date: NaiveDate) -> Option<Level> {
        self.history(variant)?
            .iter()
            .find(|p| p.date == date)
            .map(|p| p.level)
    }

    pub fn last_level(&self, variant: IndexVariant) -> Option<Level> {
        self.history(variant)?.last().map(|p| p.level)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.weights.last().map(|w| w.date)
    }

    pub fn effective_weights_on(&self, date: NaiveDate) -> Option<&WeightMap> {
        self.weights
            .iter()
            .find(|w| w.date == date)
            .map(|w| &w.effective)
    }
}

/// Per-commodity attribution of one date's return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    pub previous_date: NaiveDate,
    pub returns: DailyReturns,
    pub contributions: Vec<CommodityContribution>,
}

/// Mutable state of an in-progress run. Obtained from [`IndexCalculator::start`].
#[derive(Debug, Clone)]
pub struct IndexRun {
    phase: RunPhase,
    state: IndexState,
    prior_effective: Option<WeightMap>,
    prior_target: Option<WeightMap>,
    initial_level: Level,
}

/// Everything a date produces, held back until the whole date has succeeded.
struct PendingStep {
    date: NaiveDate,
    target: WeightMap,
    effective: WeightMap,
    frozen: BTreeSet<CommodityId>,
    reconstitution: bool,
    levels: Vec<(IndexVariant, LevelPoint)>,
    breakdown: Option<DailyBreakdown>,
    warnings: Vec<String>,
}

impl IndexRun {
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.state.last_date()
    }

    pub fn current_level(&self, variant: IndexVariant) -> Option<Level> {
        self.state.last_level(variant)
    }

    pub fn effective_weights(&self) -> Option<&WeightMap> {
        self.prior_effective.as_ref()
    }

    /// History accumulated so far.
    pub fn state(&self) -> &IndexState {
        &self.state
    }

    /// Close the run and hand back its history. No date can be added afterwards.
    pub fn finalize(&mut self) -> GsciResult<IndexState> {
        match self.phase {
            RunPhase::Uninitialized => Err(GsciError::InsufficientData(
                "Cannot finalize a run before its first date".into(),
            )),
            RunPhase::Finalized => Err(self.finalized_error()),
            RunPhase::Bootstrapped | RunPhase::Running => {
                self.phase = RunPhase::Finalized;
                self.state.phase = RunPhase::Finalized;
                Ok(self.state.clone())
            }
        }
    }

    fn finalized_error(&self) -> GsciError {
        GsciError::RunFinalized {
            last_date: self.last_date().unwrap_or(NaiveDate::MIN),
        }
    }

    fn commit(&mut self, step: PendingStep) {
        for (variant, point) in step.levels {
            self.state.levels.entry(variant).or_default().push(point);
        }
        self.state.weights.push(WeightSnapshot {
            date: step.date,
            target: step.target.clone(),
            effective: step.effective.clone(),
            frozen: step.frozen.into_iter().collect(),
            reconstitution: step.reconstitution,
        });
        self.state.final_weights = step.effective.clone();
        self.state.warnings.extend(step.warnings);
        self.prior_effective = Some(step.effective);
        self.prior_target = Some(step.target);
        self.phase = match self.phase {
            RunPhase::Uninitialized => RunPhase::Bootstrapped,
            _ => RunPhase::Running,
        };
        self.state.phase = self.phase;
    }
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

/// Commodity index calculator over injected market data sources.
///
/// Collateral, roll adjustment and enhancement default to no-ops and are
/// attached with the `with_*` builders.
#[derive(Debug, Clone)]
pub struct IndexCalculator<
    C,
    P,
    M,
    R = NoCollateral,
    A = NoRollAdjustment,
    E = NoEnhancement,
> {
    config: IndexConfig,
    universe: Vec<CommodityId>,
    cpw: C,
    prices: P,
    disruptions: M,
    collateral: R,
    roll: A,
    enhancement: E,
}

impl<C, P, M> IndexCalculator<C, P, M>
where
    C: CpwSource,
    P: PriceSource,
    M: DisruptionSource,
{
    pub fn new(config: IndexConfig, cpw: C, prices: P, disruptions: M) -> GsciResult<Self> {
        config.validate()?;
        Ok(Self {
            universe: config.symbols(),
            config,
            cpw,
            prices,
            disruptions,
            collateral: NoCollateral,
            roll: NoRollAdjustment,
            enhancement: NoEnhancement,
        })
    }
}

impl<C, P, M, R, A, E> IndexCalculator<C, P, M, R, A, E> {
    pub fn with_collateral<R2: CollateralSource>(
        self,
        collateral: R2,
    ) -> IndexCalculator<C, P, M, R2, A, E> {
        IndexCalculator {
            config: self.config,
            universe: self.universe,
            cpw: self.cpw,
            prices: self.prices,
            disruptions: self.disruptions,
            collateral,
            roll: self.roll,
            enhancement: self.enhancement,
        }
    }

    pub fn with_roll_adjustments<A2: RollAdjustmentSource>(
        self,
        roll: A2,
    ) -> IndexCalculator<C, P, M, R, A2, E> {
        IndexCalculator {
            config: self.config,
            universe: self.universe,
            cpw: self.cpw,
            prices: self.prices,
            disruptions: self.disruptions,
            collateral: self.collateral,
            roll,
            enhancement: self.enhancement,
        }
    }

    pub fn with_enhancement<E2: Enhancement>(
        self,
        enhancement: E2,
    ) -> IndexCalculator<C, P, M, R, A, E2> {
        IndexCalculator {
            config: self.config,
            universe: self.universe,
            cpw: self.cpw,
            prices: self.prices,
            disruptions: self.disruptions,
            collateral: self.collateral,
            roll: self.roll,
            enhancement,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }
}

impl<C, P, M, R, A, E> IndexCalculator<C, P, M, R, A, E>
where
    C: CpwSource,
    P: PriceSource,
    M: DisruptionSource,
    R: CollateralSource,
    A: RollAdjustmentSource,
    E: Enhancement,
{
    /// Begin a run at `initial_level` for the requested variants.
    pub fn start(&self, initial_level: Level, variants: &[IndexVariant]) -> GsciResult<IndexRun> {
        if initial_level <= Decimal::ZERO {
            return Err(GsciError::InvalidInput {
                field: "initial_level".into(),
                reason: "Initial level must be positive".into(),
            });
        }
        let variants: Vec<IndexVariant> = variants
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if variants.is_empty() {
            return Err(GsciError::InvalidInput {
                field: "variants".into(),
                reason: "At least one index variant is required".into(),
            });
        }
        self.require_collateral(&variants)?;

        Ok(IndexRun {
            phase: RunPhase::Uninitialized,
            state: IndexState {
                index_name: self.config.name.clone(),
                phase: RunPhase::Uninitialized,
                variants,
                levels: BTreeMap::new(),
                weights: Vec::new(),
                final_weights: WeightMap::new(),
                warnings: Vec::new(),
            },
            prior_effective: None,
            prior_target: None,
            initial_level,
        })
    }

    /// Process one date. On error the run is left untouched.
    pub fn step(&self, run: &mut IndexRun, date: NaiveDate) -> GsciResult<()> {
        let pending = self.evaluate(run, date)?;
        run.commit(pending);
        debug!(
            index = %self.config.name,
            %date,
            phase = ?run.phase,
            "index date committed"
        );
        Ok(())
    }

    /// Full run over `dates` (strictly increasing).
    pub fn compute(
        &self,
        dates: &[NaiveDate],
        initial_level: Level,
        variants: &[IndexVariant],
    ) -> GsciResult<IndexState> {
        if dates.is_empty() {
            return Err(GsciError::InsufficientData(
                "At least one calculation date is required".into(),
            ));
        }
        info!(
            index = %self.config.name,
            first = %dates[0],
            last = %dates[dates.len() - 1],
            days = dates.len(),
            "computing index"
        );

        let mut run = self.start(initial_level, variants)?;
        for &date in dates {
            self.step(&mut run, date)?;
        }
        run.finalize()
    }

    /// Single-step return for `variant` with no run history.
    ///
    /// The prior weights are the targets at `previous_date`, as on the first
    /// date of a run. When a disruption may have held weights away from their
    /// targets at `previous_date`, use [`Self::index_return_from`] with the
    /// effective weights of that close.
    pub fn index_return(
        &self,
        date: NaiveDate,
        previous_date: NaiveDate,
        variant: IndexVariant,
    ) -> GsciResult<Rate> {
        let prior = self.target_weights(previous_date)?;
        self.index_return_from(&prior, date, previous_date, variant)
    }

    /// Single-step return from the effective weights in force at `previous_date`.
    ///
    /// With `prior` taken from a run's weight snapshot this reproduces that
    /// run's day return for `date`.
    pub fn index_return_from(
        &self,
        prior: &WeightMap,
        date: NaiveDate,
        previous_date: NaiveDate,
        variant: IndexVariant,
    ) -> GsciResult<Rate> {
        self.require_collateral(&[variant])?;
        let breakdown = self.breakdown_for(prior, date, previous_date, &[variant])?;
        Ok(breakdown.returns.for_variant(variant))
    }

    /// Single-step level for `variant` given the level at `previous_date`.
    /// Prior weights as in [`Self::index_return`].
    pub fn index_level(
        &self,
        date: NaiveDate,
        previous_date: NaiveDate,
        previous_level: Level,
        variant: IndexVariant,
    ) -> GsciResult<Level> {
        let prior = self.target_weights(previous_date)?;
        self.index_level_from(&prior, date, previous_date, previous_level, variant)
    }

    /// Single-step level from the effective weights in force at `previous_date`.
    pub fn index_level_from(
        &self,
        prior: &WeightMap,
        date: NaiveDate,
        previous_date: NaiveDate,
        previous_level: Level,
        variant: IndexVariant,
    ) -> GsciResult<Level> {
        if previous_level <= Decimal::ZERO {
            return Err(GsciError::InvalidInput {
                field: "previous_level".into(),
                reason: "Previous level must be positive".into(),
            });
        }
        let day_return = self.index_return_from(prior, date, previous_date, variant)?;
        next_level(previous_level, day_return)
    }

    /// Per-commodity attribution for one step. Collateral components are zero
    /// when no collateral source is attached. Prior weights as in [`Self::index_return`].
    pub fn daily_breakdown(
        &self,
        date: NaiveDate,
        previous_date: NaiveDate,
    ) -> GsciResult<DailyBreakdown> {
        let prior = self.target_weights(previous_date)?;
        self.daily_breakdown_from(&prior, date, previous_date)
    }

    /// Per-commodity attribution for one step from the effective weights at `previous_date`.
    pub fn daily_breakdown_from(
        &self,
        prior: &WeightMap,
        date: NaiveDate,
        previous_date: NaiveDate,
    ) -> GsciResult<DailyBreakdown> {
        self.breakdown_for(prior, date, previous_date, self.available_variants())
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    fn available_variants(&self) -> &'static [IndexVariant] {
        if self.collateral.is_available() {
            &IndexVariant::ALL
        } else {
            &[IndexVariant::Excess]
        }
    }

    fn require_collateral(&self, variants: &[IndexVariant]) -> GsciResult<()> {
        if variants.iter().any(|v| v.needs_collateral()) && !self.collateral.is_available() {
            return Err(GsciError::InvalidInput {
                field: "collateral".into(),
                reason: "Total and Enhanced variants require a collateral rate source".into(),
            });
        }
        Ok(())
    }

    /// Returns for one step outside a run.
    fn breakdown_for(
        &self,
        prior: &WeightMap,
        date: NaiveDate,
        previous_date: NaiveDate,
        variants: &[IndexVariant],
    ) -> GsciResult<DailyBreakdown> {
        if date <= previous_date {
            return Err(GsciError::InvalidDateSequence {
                previous: previous_date,
                current: date,
            });
        }
        if let Some((c, w)) = prior.iter().find(|(_, w)| **w < Decimal::ZERO) {
            return Err(GsciError::InvalidWeight {
                date: Some(previous_date),
                reason: format!("Negative prior weight {w} for {c}"),
            });
        }
        if weight_sum(prior).is_zero() {
            return Err(GsciError::InvalidWeight {
                date: Some(previous_date),
                reason: "Prior weights carry no mass".into(),
            });
        }
        self.compose_returns(date, previous_date, prior, variants)
    }

    fn target_weights(&self, date: NaiveDate) -> GsciResult<WeightMap> {
        let cpw = self.cpw.cpw(date)?;
        normalize_universe(&cpw, &self.universe).map_err(|e| e.on_date(date))
    }

    fn evaluate(&self, run: &IndexRun, date: NaiveDate) -> GsciResult<PendingStep> {
        match run.phase {
            RunPhase::Finalized => return Err(run.finalized_error()),
            RunPhase::Uninitialized => return self.evaluate_bootstrap(run, date),
            RunPhase::Bootstrapped | RunPhase::Running => {}
        }

        let (Some(previous_date), Some(prior)) = (run.last_date(), run.prior_effective.as_ref())
        else {
            return Err(GsciError::InsufficientData(
                "Run has no prior date despite being initialized".into(),
            ));
        };
        if date <= previous_date {
            return Err(GsciError::InvalidDateSequence {
                previous: previous_date,
                current: date,
            });
        }
        let tolerance = self.config.weight_tolerance;

        // 1. Target weights
        let target = self.target_weights(date)?;
        let reconstitution = run
            .prior_target
            .as_ref()
            .map_or(true, |p| targets_changed(p, &target, tolerance));

        // 2. Frozen / free
        let partition = classify(date, &self.universe, &self.disruptions, Some(prior))?;

        // 3. Effective weights
        let outcome = rebalance(date, prior, &target, &partition.frozen, tolerance)?;

        // 4. Returns and levels (weights fixed at the previous close)
        let breakdown = self.compose_returns(date, previous_date, prior, &run.state.variants)?;
        let mut levels = Vec::with_capacity(run.state.variants.len());
        for &variant in &run.state.variants {
            let prior_level = run.current_level(variant).ok_or_else(|| {
                GsciError::InsufficientData(format!("No prior {variant} level before {date}"))
            })?;
            let day_return = breakdown.returns.for_variant(variant);
            levels.push((
                variant,
                LevelPoint {
                    date,
                    level: next_level(prior_level, day_return)?,
                    day_return,
                },
            ));
        }

        let mut warnings = outcome.warnings;
        warnings.extend(self.price_move_warnings(&breakdown));

        Ok(PendingStep {
            date,
            target,
            effective: outcome.weights,
            frozen: partition.frozen,
            reconstitution,
            levels,
            breakdown: Some(breakdown),
            warnings,
        })
    }

    fn evaluate_bootstrap(&self, run: &IndexRun, date: NaiveDate) -> GsciResult<PendingStep> {
        let target = self.target_weights(date)?;
        let levels = run
            .state
            .variants
            .iter()
            .map(|&v| {
                (
                    v,
                    LevelPoint {
                        date,
                        level: run.initial_level,
                        day_return: Decimal::ZERO,
                    },
                )
            })
            .collect();

        Ok(PendingStep {
            date,
            effective: target.clone(),
            target,
            frozen: BTreeSet::new(),
            reconstitution: true,
            levels,
            breakdown: None,
            warnings: Vec::new(),
        })
    }

    fn compose_returns(
        &self,
        date: NaiveDate,
        previous_date: NaiveDate,
        prior: &WeightMap,
        variants: &[IndexVariant],
    ) -> GsciResult<DailyBreakdown> {
        let mut previous_prices = PriceMap::new();
        let mut current_prices = PriceMap::new();
        let mut rolls: BTreeMap<CommodityId, Rate> = BTreeMap::new();

        for (c, w) in prior {
            if w.is_zero() {
                continue;
            }
            if let Some(p) = self.prices.price(previous_date, c)? {
                previous_prices.insert(c.clone(), p);
            }
            if let Some(p) = self.prices.price(date, c)? {
                current_prices.insert(c.clone(), p);
            }
            rolls.insert(c.clone(), self.roll.roll_adjustment(date, c)?);
        }

        let excess = daily_return(
            date,
            previous_date,
            prior,
            &previous_prices,
            &current_prices,
            &rolls,
        )?;

        // Collateral accrues from the previous close.
        let collateral = if variants.iter().any(|v| v.needs_collateral()) {
            self.collateral.daily_rate(previous_date)?
        } else {
            Decimal::ZERO
        };
        let enhancement = if variants.contains(&IndexVariant::Enhanced) {
            self.enhancement
                .adjustment(date, previous_date, excess.excess_return + collateral)?
        } else {
            Decimal::ZERO
        };

        Ok(DailyBreakdown {
            date,
            previous_date,
            returns: compose(excess.excess_return, collateral, enhancement),
            contributions: excess.contributions,
        })
    }

    fn price_move_warnings(&self, breakdown: &DailyBreakdown) -> Vec<String> {
        let Some(threshold) = self.config.price_move_warning else {
            return Vec::new();
        };
        breakdown
            .contributions
            .iter()
            .filter(|c| (c.price_relative - Decimal::ONE).abs() > threshold)
            .map(|c| {
                warn!(
                    date = %breakdown.date,
                    commodity = %c.commodity,
                    relative = %c.price_relative,
                    "daily price move above data-quality threshold"
                );
                format!(
                    "{}: {} price relative {} exceeds the {} daily move threshold",
                    breakdown.date, c.commodity, c.price_relative, threshold
                )
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Serializable request for a full index run over an in-memory data set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexCalculationInput {
    pub config: IndexConfig,
    pub market_data: MarketDataSet,
    /// Calculation dates. Defaults to every date carrying prices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<Vec<NaiveDate>>,
    /// Overrides `config.initial_level`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_level: Option<Level>,
    /// Overrides `config.variants`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<IndexVariant>>,
}

/// Serializable request for a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStepInput {
    pub config: IndexConfig,
    pub market_data: MarketDataSet,
    pub date: NaiveDate,
    pub previous_date: NaiveDate,
    /// Level at `previous_date`; when present the output carries the new level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_level: Option<Level>,
    /// Effective weights at the `previous_date` close. Defaults to that date's
    /// targets, which is only exact when no disruption was holding a weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_weights: Option<WeightMap>,
    #[serde(default = "default_step_variant")]
    pub variant: IndexVariant,
}

fn default_step_variant() -> IndexVariant {
    IndexVariant::Excess
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStepOutput {
    pub date: NaiveDate,
    pub previous_date: NaiveDate,
    pub variant: IndexVariant,
    pub day_return: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    pub breakdown: DailyBreakdown,
}

/// Run the index over an in-memory data set and wrap the result in the output envelope.
pub fn calculate_index(
    input: &IndexCalculationInput,
) -> GsciResult<ComputationOutput<IndexState>> {
    let start = Instant::now();
    input.market_data.validate()?;

    let data = &input.market_data;
    let spread = input
        .config
        .enhancement_spread
        .map(|annual_rate| AnnualizedSpread { annual_rate });
    let calculator = IndexCalculator::new(input.config.clone(), data, data, data)?
        .with_collateral(data)
        .with_roll_adjustments(data)
        .with_enhancement(spread);

    let dates = input.dates.clone().unwrap_or_else(|| data.price_dates());
    let initial_level = input.initial_level.unwrap_or(input.config.initial_level);
    let variants = input
        .variants
        .clone()
        .unwrap_or_else(|| input.config.variants.clone());

    let state = calculator.compute(&dates, initial_level, &variants)?;
    let warnings = state.warnings.clone();

    Ok(with_metadata(
        "S&P GSCI-style daily rebalanced index (CPW targets, MDE freeze, ER/TR/enhanced)",
        &input.config,
        warnings,
        start.elapsed().as_micros() as u64,
        state,
    ))
}

/// Single-step return (and optionally level) with per-commodity attribution.
pub fn calculate_index_step(
    input: &IndexStepInput,
) -> GsciResult<ComputationOutput<IndexStepOutput>> {
    let start = Instant::now();
    input.market_data.validate()?;

    let data = &input.market_data;
    let spread = input
        .config
        .enhancement_spread
        .map(|annual_rate| AnnualizedSpread { annual_rate });
    let calculator = IndexCalculator::new(input.config.clone(), data, data, data)?
        .with_collateral(data)
        .with_roll_adjustments(data)
        .with_enhancement(spread);

    calculator.require_collateral(&[input.variant])?;
    let prior = match &input.previous_weights {
        Some(weights) => weights.clone(),
        None => calculator.target_weights(input.previous_date)?,
    };
    let breakdown = calculator.daily_breakdown_from(&prior, input.date, input.previous_date)?;
    let day_return = breakdown.returns.for_variant(input.variant);
    let level = match input.previous_level {
        Some(previous_level) if previous_level <= Decimal::ZERO => {
            return Err(GsciError::InvalidInput {
                field: "previous_level".into(),
                reason: "Previous level must be positive".into(),
            });
        }
        Some(previous_level) => Some(next_level(previous_level, day_return)?),
        None => None,
    };
    let warnings = calculator.price_move_warnings(&breakdown);

    let output = IndexStepOutput {
        date: input.date,
        previous_date: input.previous_date,
        variant: input.variant,
        day_return,
        level,
        breakdown,
    };

    Ok(with_metadata(
        "Single-step index return from previous-close effective weights",
        &input.config,
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
