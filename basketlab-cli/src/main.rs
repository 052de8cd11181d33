//! basketlab CLI: scenario replays and engine calculators.
//!
//! Commands:
//! - `simulate`: replay one TOML scenario and save its report
//! - `batch`: replay several scenarios in parallel with a summary CSV
//! - `report`: print the summary of a saved report
//! - `auction`: compute linear auction start and pivot prices
//! - `indicator`: evaluate RSI, EMA or SMA over a price list
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::prelude::*;

use basketlab_core::domain::U256;
use basketlab_core::indicators::{calculate_ema, calculate_rsi, simple_moving_average};
use basketlab_core::manager::{calculate_auction_price_parameters, AuctionPriceModel};
use basketlab_core::math::{format_scaled, usd, PRICE_DECIMALS};
use basketlab_runner::batch::{load_scenarios, run_batch, save_batch, summarize};
use basketlab_runner::report::{read_report, save_artifacts};
use basketlab_runner::{export_json, ScenarioConfig, Simulation};

#[derive(Parser)]
#[command(
    name = "basketlab",
    about = "basketlab: two-asset basket rebalancing engine and simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file and save its report.
    Simulate {
        /// Path to a TOML scenario file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for report artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the full JSON report instead of the summary line.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Replay several scenario files in parallel.
    Batch {
        /// Scenario files.
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Output directory for reports and summary.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Print the summary of a saved report.json.
    Report {
        path: PathBuf,
    },
    /// Compute auction start and pivot prices for a rotation.
    Auction {
        /// Value of the current set, in cents.
        #[arg(long)]
        current_value: u64,

        /// Value of the next set, in cents.
        #[arg(long)]
        next_value: u64,

        /// Seconds from auction start to the pivot.
        #[arg(long, default_value_t = 21_600)]
        time_to_pivot: u64,

        /// Seconds per 1% price move (linear band).
        #[arg(long, default_value_t = 1_800)]
        time_increment: u64,

        /// Fixed offsets below and above fair value, in percent. Replaces
        /// the linear band when both are given.
        #[arg(long, requires = "pivot_percentage")]
        start_percentage: Option<u64>,

        #[arg(long, requires = "start_percentage")]
        pivot_percentage: Option<u64>,
    },
    /// Evaluate an indicator over dollar prices, oldest first.
    Indicator {
        #[arg(value_enum)]
        kind: IndicatorKind,

        /// Indicator period.
        #[arg(long)]
        period: usize,

        /// Prices such as 150 or 150.25.
        #[arg(required = true, num_args = 1..)]
        prices: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IndicatorKind {
    Rsi,
    Ema,
    Sma,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            output_dir,
            json,
        } => run_simulate(config, output_dir, json),
        Commands::Batch {
            configs,
            output_dir,
        } => run_batch_cmd(&configs, output_dir),
        Commands::Report { path } => {
            let report = read_report(&path)?;
            println!("{}", report.summary());
            Ok(())
        }
        Commands::Auction {
            current_value,
            next_value,
            time_to_pivot,
            time_increment,
            start_percentage,
            pivot_percentage,
        } => {
            let model = match (start_percentage, pivot_percentage) {
                (Some(start_percentage), Some(pivot_percentage)) => {
                    AuctionPriceModel::PercentageOffsets {
                        start_percentage,
                        pivot_percentage,
                    }
                }
                _ => AuctionPriceModel::LinearBand { time_increment },
            };
            run_auction(current_value, next_value, time_to_pivot, model)
        }
        Commands::Indicator {
            kind,
            period,
            prices,
        } => run_indicator(kind, period, &prices),
    }
}

fn run_simulate(config_path: PathBuf, output_dir: PathBuf, json: bool) -> Result<()> {
    let config = ScenarioConfig::from_file(&config_path)?;
    let simulation = Simulation::from_config(config)?;
    let report = simulation.run()?;

    if json {
        println!("{}", export_json(&report)?);
    } else {
        println!("{}", report.summary());
    }

    let run_dir = save_artifacts(&report, &output_dir)?;
    info!(dir = %run_dir.display(), "artifacts saved");
    Ok(())
}

fn run_batch_cmd(paths: &[PathBuf], output_dir: PathBuf) -> Result<()> {
    let configs = load_scenarios(paths)?;
    let outcomes = run_batch(&configs);

    for row in summarize(&outcomes) {
        match row.error {
            Some(error) => eprintln!("{}: FAILED: {error}", row.scenario),
            None => println!(
                "{}: {} rotations, final value ${}",
                row.scenario,
                row.rotations,
                format_scaled(row.final_value_cents, 2)
            ),
        }
    }

    let summary = save_batch(&outcomes, &output_dir)?;
    println!("Summary saved to: {}", summary.display());

    if outcomes.iter().any(|o| o.result.is_err()) {
        bail!("one or more scenarios failed");
    }
    Ok(())
}

fn run_auction(
    current_value: u64,
    next_value: u64,
    time_to_pivot: u64,
    model: AuctionPriceModel,
) -> Result<()> {
    let params = calculate_auction_price_parameters(
        U256::from(current_value),
        U256::from(next_value),
        time_to_pivot,
        model,
    )?;
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}

fn run_indicator(kind: IndicatorKind, period: usize, prices: &[String]) -> Result<()> {
    if period == 0 {
        bail!("--period must be positive");
    }
    let values = prices
        .iter()
        .map(|p| usd(p).with_context(|| format!("invalid price '{p}'")))
        .collect::<Result<Vec<U256>>>()?;

    let value = match kind {
        IndicatorKind::Rsi => {
            if values.len() < period + 1 {
                bail!("RSI({period}) needs {} prices, got {}", period + 1, values.len());
            }
            let newest_first: Vec<U256> = values.iter().rev().take(period + 1).copied().collect();
            println!("{}", calculate_rsi(&newest_first)?);
            return Ok(());
        }
        IndicatorKind::Ema => {
            let (first, rest) = values
                .split_first()
                .context("at least one price is required")?;
            rest.iter().try_fold(*first, |ema, price| {
                calculate_ema(ema, period as u64, *price)
            })?
        }
        IndicatorKind::Sma => {
            let start = values.len().saturating_sub(period);
            simple_moving_average(&values[start..])?
        }
    };
    println!("{}", format_scaled(value, PRICE_DECIMALS));
    Ok(())
}
