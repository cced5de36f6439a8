use std::collections::BTreeMap;

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use gsci_core::config::CommoditySpec;
use gsci_core::index::weighting;
use gsci_core::index::{self, IndexCalculationInput, IndexState, IndexStepInput};
use gsci_core::{weight_sum, IndexConfig, IndexVariant, Level, WeightMap};

use crate::input;

#[derive(Args)]
pub struct ComputeArgs {
    /// Calculation input (config + market data), JSON or YAML
    #[arg(long)]
    pub input: Option<String>,

    /// Replace the input's index configuration with this file
    #[arg(long)]
    pub config: Option<String>,

    /// First calculation date (inclusive)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last calculation date (inclusive)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Starting level for every variant
    #[arg(long)]
    pub initial_level: Option<Decimal>,

    /// Comma-separated variants (e.g. "excess,total")
    #[arg(long, value_delimiter = ',')]
    pub variants: Option<Vec<IndexVariant>>,

    /// Print one row per date instead of the full output
    #[arg(long)]
    pub history: bool,
}

/// Arguments shared by the single-step commands
#[derive(Args)]
pub struct StepArgs {
    /// Step input (config + market data + dates), JSON or YAML
    #[arg(long)]
    pub input: Option<String>,

    /// Replace the input's index configuration with this file
    #[arg(long)]
    pub config: Option<String>,

    /// Calculation date
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Preceding calculation date
    #[arg(long)]
    pub previous_date: Option<NaiveDate>,

    /// Index variant
    #[arg(long)]
    pub variant: Option<IndexVariant>,

    /// Index level at the preceding date
    #[arg(long)]
    pub previous_level: Option<Decimal>,

    /// Effective weights at the preceding close (e.g. "CL=0.5,NG=0.3,GC=0.2")
    #[arg(long, value_delimiter = ',')]
    pub previous_weights: Option<Vec<String>>,
}

#[derive(Args)]
pub struct NormalizeArgs {
    /// CPW mapping (commodity -> raw weight), JSON or YAML
    #[arg(long)]
    pub input: Option<String>,

    /// Inline weights, comma-separated (e.g. "CL=0.5,NG=0.3,GC=0.2")
    #[arg(long, value_delimiter = ',')]
    pub weights: Option<Vec<String>>,

    /// Use the built-in reference weights of the standard universe
    #[arg(long)]
    pub standard: bool,
}

#[derive(Debug, Serialize)]
struct HistoryRow {
    date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    excess: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enhanced: Option<Level>,
    frozen: String,
    reconstitution: bool,
}

#[derive(Debug, Serialize)]
struct NormalizeOutput {
    weights: WeightMap,
    raw_total: Decimal,
    weight_sum: Decimal,
    commodities: usize,
}

pub fn run_compute(args: ComputeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut input_data: IndexCalculationInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json|file.yaml> or stdin required".into());
    };

    if let Some(ref path) = args.config {
        input_data.config = input::file::read_document::<IndexConfig>(path)?;
    }
    if args.from.is_some() || args.to.is_some() {
        let dates = input_data
            .dates
            .take()
            .unwrap_or_else(|| input_data.market_data.price_dates());
        input_data.dates = Some(
            dates
                .into_iter()
                .filter(|d| args.from.map_or(true, |f| *d >= f))
                .filter(|d| args.to.map_or(true, |t| *d <= t))
                .collect(),
        );
    }
    if args.initial_level.is_some() {
        input_data.initial_level = args.initial_level;
    }
    if args.variants.is_some() {
        input_data.variants = args.variants;
    }

    let result = index::calculate_index(&input_data)?;
    info!(
        index = %result.result.index_name,
        days = result.result.weights.len(),
        warnings = result.warnings.len(),
        "index computed"
    );

    if args.history {
        return Ok(serde_json::to_value(history_rows(&result.result))?);
    }
    Ok(serde_json::to_value(result)?)
}

pub fn run_index_return(args: StepArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut input_data = read_step_input(&args)?;
    input_data.previous_level = None;
    let result = index::calculate_index_step(&input_data)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_index_level(args: StepArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input_data = read_step_input(&args)?;
    if input_data.previous_level.is_none() {
        return Err("--previous-level (or previous_level in the input) required".into());
    }
    let result = index::calculate_index_step(&input_data)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_breakdown(args: StepArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input_data = read_step_input(&args)?;
    let result = index::calculate_index_step(&input_data)?;
    Ok(serde_json::to_value(result.result.breakdown.contributions)?)
}

pub fn run_normalize(args: NormalizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cpw: WeightMap = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(ref pairs) = args.weights {
        parse_weight_pairs(pairs)?
    } else if args.standard {
        CommoditySpec::standard_reference_weights()
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file>, --weights, --standard or stdin required".into());
    };

    let weights = weighting::normalize(&cpw)?;
    let output = NormalizeOutput {
        raw_total: weight_sum(&cpw),
        weight_sum: weight_sum(&weights),
        commodities: weights.len(),
        weights,
    };
    Ok(serde_json::to_value(output)?)
}

fn read_step_input(args: &StepArgs) -> Result<IndexStepInput, Box<dyn std::error::Error>> {
    let mut input_data: IndexStepInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json|file.yaml> or stdin required".into());
    };

    if let Some(ref path) = args.config {
        input_data.config = input::file::read_document::<IndexConfig>(path)?;
    }
    if let Some(date) = args.date {
        input_data.date = date;
    }
    if let Some(previous_date) = args.previous_date {
        input_data.previous_date = previous_date;
    }
    if let Some(variant) = args.variant {
        input_data.variant = variant;
    }
    if args.previous_level.is_some() {
        input_data.previous_level = args.previous_level;
    }
    if let Some(ref pairs) = args.previous_weights {
        input_data.previous_weights = Some(parse_weight_pairs(pairs)?);
    }
    Ok(input_data)
}

fn history_rows(state: &IndexState) -> Vec<HistoryRow> {
    state
        .weights
        .iter()
        .map(|snapshot| HistoryRow {
            date: snapshot.date,
            excess: state.level_on(IndexVariant::Excess, snapshot.date),
            total: state.level_on(IndexVariant::Total, snapshot.date),
            enhanced: state.level_on(IndexVariant::Enhanced, snapshot.date),
            frozen: snapshot.frozen.join(" "),
            reconstitution: snapshot.reconstitution,
        })
        .collect()
}

fn parse_weight_pairs(pairs: &[String]) -> Result<WeightMap, Box<dyn std::error::Error>> {
    let mut out = BTreeMap::new();
    for pair in pairs {
        let (symbol, weight) = pair
            .split_once('=')
            .ok_or_else(|| format!("Expected SYMBOL=WEIGHT, got '{pair}'"))?;
        let weight: Decimal = weight
            .trim()
            .parse()
            .map_err(|e| format!("Invalid weight for {symbol}: {e}"))?;
        out.insert(symbol.trim().to_string(), weight);
    }
    Ok(out)
}
