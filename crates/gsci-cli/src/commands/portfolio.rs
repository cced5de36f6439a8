use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use gsci_core::portfolio::{self, PortfolioInput, RiskLimits};

use crate::input;

/// Arguments for portfolio construction
#[derive(Args)]
pub struct PortfolioArgs {
    /// Portfolio input (date, weights, prices, universe), JSON or YAML
    #[arg(long)]
    pub input: Option<String>,

    /// Override the target notional
    #[arg(long)]
    pub notional: Option<Decimal>,

    /// Apply the standard concentration limits (25% commodity, 60% sector)
    #[arg(long)]
    pub standard_limits: bool,
}

pub fn run_portfolio(args: PortfolioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut input_data: PortfolioInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json|file.yaml> or stdin required".into());
    };

    if let Some(notional) = args.notional {
        input_data.target_notional = notional;
    }
    if args.standard_limits {
        input_data.limits = RiskLimits::standard();
    }

    let result = portfolio::construct_portfolio(&input_data)?;
    Ok(serde_json::to_value(result)?)
}
