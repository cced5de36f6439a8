mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::index::{ComputeArgs, NormalizeArgs, StepArgs};
use commands::portfolio::PortfolioArgs;

/// S&P GSCI-style commodity index calculations
#[derive(Parser)]
#[command(
    name = "gsci",
    version,
    about = "S&P GSCI-style commodity index calculations",
    long_about = "A CLI for computing production-weighted commodity index levels with decimal \
                  precision. Supports Excess, Total and Enhanced Return variants, market \
                  disruption handling, single-step recomputation and portfolio sizing."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute index levels over a date sequence
    Compute(ComputeArgs),
    /// Single-step index return between two dates
    IndexReturn(StepArgs),
    /// Single-step index level from the previous level
    IndexLevel(StepArgs),
    /// Per-commodity attribution of one day's excess return
    Breakdown(StepArgs),
    /// Normalize raw CPW values into target weights
    Normalize(NormalizeArgs),
    /// Size an index-tracking portfolio for a target notional
    Portfolio(PortfolioArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(&cli.log_level) {
        eprintln!("{}: {}", "warning".yellow().bold(), e);
    }

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Compute(args) => commands::index::run_compute(args),
        Commands::IndexReturn(args) => commands::index::run_index_return(args),
        Commands::IndexLevel(args) => commands::index::run_index_level(args),
        Commands::Breakdown(args) => commands::index::run_breakdown(args),
        Commands::Normalize(args) => commands::index::run_normalize(args),
        Commands::Portfolio(args) => commands::portfolio::run_portfolio(args),
        Commands::Version => {
            println!("gsci {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
